//! SELECT and the two shapes of its payload

use std::fmt;

use bytes::Bytes;
use lightwallet_apdu_core::{Response, prelude::status};

use crate::{Error, Result, constants::{ins, tags}, types::ApplicationInfo};

keycard_command! {
    /// SELECT (by name) command
    pub struct SelectCommand {
        cla: 0x00,
        ins: ins::SELECT,
    }
    ok: SelectOk,
    parse: parse_select_response,
}

impl SelectCommand {
    /// Select an application by its AID
    pub fn with_aid(aid: &[u8]) -> Self {
        Self::new(0x04, 0x00)
            .with_data(Bytes::copy_from_slice(aid))
            .with_le(0)
    }
}

/// Outcome of SELECT
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOk {
    /// The application answered with its selection payload
    Selected(Bytes),
    /// No application with this AID is installed
    NotFound,
}

fn parse_select_response(response: Response) -> Result<SelectOk> {
    match response.status() {
        status::SUCCESS => Ok(SelectOk::Selected(response.payload().clone())),
        status::FILE_NOT_FOUND => Ok(SelectOk::NotFound),
        sw => Err(Error::UnexpectedStatus(sw)),
    }
}

/// Parsed SELECT payload of an installed application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The applet waits for INIT and only exposes its public key
    PreInitialized {
        /// SEC1 card key for INIT, empty if the card sent none
        public_key: Bytes,
    },
    /// Regular response with application info
    Initialized(ApplicationInfo),
}

impl Selection {
    /// Whether the card answered with the application info template
    pub const fn is_initialized(&self) -> bool {
        matches!(self, Self::Initialized(_))
    }
}

impl TryFrom<&[u8]> for Selection {
    type Error = Error;

    fn try_from(payload: &[u8]) -> Result<Self> {
        match payload.first() {
            None => Err(Error::InvalidResponseData("empty SELECT response")),
            // `80 LL <public key>`
            Some(&tags::SELECT_RESPONSE_PRE_INITIALIZED) => Ok(Self::PreInitialized {
                public_key: Bytes::copy_from_slice(payload.get(2..).unwrap_or_default()),
            }),
            Some(_) => ApplicationInfo::from_template(payload).map(Self::Initialized),
        }
    }
}

impl From<Selection> for ApplicationInfo {
    fn from(selection: Selection) -> Self {
        match selection {
            Selection::PreInitialized { public_key } => Self::pre_initialized(public_key),
            Selection::Initialized(info) => info,
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initialized(info) => write!(f, "{info}"),
            Self::PreInitialized { public_key } => {
                writeln!(f, "Pre-initialized State:")?;
                write!(f, "  Public Key: {}", hex::encode(public_key))
            }
        }
    }
}
