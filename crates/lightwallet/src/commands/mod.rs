//! APDU commands understood by the wallet applet

use bytes::Bytes;
use lightwallet_apdu_core::Response;

use crate::{Error, Result};

/// Declare a command type with fixed CLA/INS and wire it into [`ApduCommand`].
///
/// [`ApduCommand`]: lightwallet_apdu_core::ApduCommand
macro_rules! keycard_command {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            cla: $cla:expr,
            ins: $ins:expr,
        }
        ok: $ok:ty,
        parse: $parse:path $(,)?
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            p1: u8,
            p2: u8,
            data: Option<::bytes::Bytes>,
            le: Option<::lightwallet_apdu_core::ExpectedLength>,
        }

        impl $name {
            /// Class byte
            pub const CLA: u8 = $cla;
            /// Instruction byte
            pub const INS: u8 = $ins;

            const fn new(p1: u8, p2: u8) -> Self {
                Self {
                    p1,
                    p2,
                    data: None,
                    le: None,
                }
            }

            fn with_data(mut self, data: impl Into<::bytes::Bytes>) -> Self {
                self.data = Some(data.into());
                self
            }

            #[allow(dead_code)]
            const fn with_le(mut self, le: ::lightwallet_apdu_core::ExpectedLength) -> Self {
                self.le = Some(le);
                self
            }
        }

        impl ::lightwallet_apdu_core::ApduCommand for $name {
            type Success = $ok;
            type Error = crate::Error;

            fn class(&self) -> u8 {
                Self::CLA
            }

            fn instruction(&self) -> u8 {
                Self::INS
            }

            fn p1(&self) -> u8 {
                self.p1
            }

            fn p2(&self) -> u8 {
                self.p2
            }

            fn data(&self) -> Option<&[u8]> {
                self.data.as_deref()
            }

            fn expected_length(&self) -> Option<::lightwallet_apdu_core::ExpectedLength> {
                self.le
            }

            fn parse_response(
                response: ::lightwallet_apdu_core::Response,
            ) -> crate::Result<Self::Success> {
                $parse(response)
            }
        }
    };
}

pub mod init;
pub use init::*;
pub mod mutually_authenticate;
pub use mutually_authenticate::*;
pub mod open_secure_channel;
pub use open_secure_channel::*;
pub mod pair;
pub use pair::*;
pub mod select;
pub use select::*;

/// CLA of the proprietary wallet commands
pub const CLA_GP: u8 = 0x80;

/// Accept only `90 00`, yielding the payload.
pub(crate) fn expect_success(response: Response) -> Result<Bytes> {
    response
        .into_payload()
        .map_err(|e| Error::UnexpectedStatus(e.status))
}
