//! Secure channel over a card transport.
//!
//! A channel starts in the [`Handshake`] state right after OPEN SECURE CHANNEL:
//! keys are derived, but the card has not yet proven it holds the same ones.
//! Only [`SecureChannel::mutually_authenticate`] turns it into an
//! [`Established`] channel, the only state callers can send commands through.
//! Any integrity failure drops the session, after which the channel refuses
//! all traffic with [`Error::ChannelClosed`].

use std::fmt;
use std::marker::PhantomData;

use lightwallet_apdu_core::{ApduCommand, CardTransport, Command, Response};
use tracing::{debug, warn};

use crate::{
    Error, Result,
    commands::MutuallyAuthenticateCommand,
    crypto::Challenge,
    session::Session,
};

/// Keys derived, mutual authentication pending
#[derive(Debug)]
pub struct Handshake;

/// Mutually authenticated channel
#[derive(Debug)]
pub struct Established;

/// Secure channel to a card
pub struct SecureChannel<T: CardTransport, S = Established> {
    transport: T,
    session: Option<Session>,
    _state: PhantomData<S>,
}

impl<T: CardTransport, S> fmt::Debug for SecureChannel<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureChannel")
            .field("transport", &self.transport)
            .field("open", &self.is_open())
            .finish()
    }
}

impl<T: CardTransport, S> SecureChannel<T, S> {
    /// Whether the session keys are still usable
    pub const fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Drop the session keys. Later calls fail with [`Error::ChannelClosed`].
    pub fn close(&mut self) {
        if self.session.take().is_some() {
            debug!("Secure channel closed");
        }
    }

    /// Close the channel and hand back the transport
    pub fn into_transport(mut self) -> T {
        self.close();
        self.transport
    }

    /// Protect a command, send it and verify the reply.
    ///
    /// A command that cannot be protected is refused with the session intact.
    /// Once it is protected the IV has advanced, so any later failure leaves
    /// host and card out of sync and closes the session.
    fn exchange(&mut self, command: &Command) -> Result<Response> {
        let session = self.session.as_mut().ok_or(Error::ChannelClosed)?;
        let protected = session.protect_command(command)?;

        let result = round_trip(&mut self.transport, session, &protected);
        if let Err(e) = &result {
            warn!(error = %e, "Secure channel exchange failed, closing session");
            self.session = None;
        }
        result
    }
}

fn round_trip<T: CardTransport>(
    transport: &mut T,
    session: &mut Session,
    protected: &Command,
) -> Result<Response> {
    let raw = transport.transmit_raw(&protected.to_bytes()?)?;
    let response = Response::from_bytes(&raw)?;
    session.process_response(&response)
}

impl<T: CardTransport> SecureChannel<T, Handshake> {
    pub(crate) const fn new(transport: T, session: Session) -> Self {
        Self {
            transport,
            session: Some(session),
            _state: PhantomData,
        }
    }

    /// Prove both sides derived the same keys.
    ///
    /// Sends MUTUALLY AUTHENTICATE with `challenge` through the channel and
    /// requires `90 00` on the verified inner response. On failure the
    /// pending channel is consumed, so no half-open channel escapes.
    pub(crate) fn mutually_authenticate(
        mut self,
        challenge: &Challenge,
    ) -> Result<SecureChannel<T, Established>> {
        let command = MutuallyAuthenticateCommand::with_challenge(challenge).to_command();

        let outcome = self
            .exchange(&command)
            .and_then(MutuallyAuthenticateCommand::parse_response);

        match outcome {
            Ok(_) => {
                debug!("Mutual authentication succeeded");
                Ok(SecureChannel {
                    transport: self.transport,
                    session: self.session.take(),
                    _state: PhantomData,
                })
            }
            Err(e) => {
                warn!(error = %e, "Mutual authentication failed");
                self.close();
                Err(Error::MutualAuthenticationFailed(Box::new(e)))
            }
        }
    }
}

impl<T: CardTransport> SecureChannel<T, Established> {
    /// Send a command through the channel and return the card's plain response.
    ///
    /// The returned response carries the inner status word; a non-success
    /// inner status is not an error at this layer.
    pub fn transmit(&mut self, command: &Command) -> Result<Response> {
        debug!(
            cla = command.cla,
            ins = command.ins,
            p1 = command.p1,
            p2 = command.p2,
            "Sending command over secure channel"
        );
        let response = self.exchange(command)?;
        debug!(status = %response.status(), "Secure channel response");
        Ok(response)
    }

    /// Send a typed command and parse its response
    pub fn execute<C>(&mut self, command: &C) -> std::result::Result<C::Success, C::Error>
    where
        C: ApduCommand,
        C::Error: From<Error>,
    {
        let response = self.transmit(&command.to_command())?;
        C::parse_response(response)
    }
}
