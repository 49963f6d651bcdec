//! Transport traits for APDU communication with cards
//!
//! A transport moves opaque command/response buffers to and from exactly one
//! card. It enforces nothing about the protocol running on top of it; callers
//! issue one command at a time and block until the response arrives.

pub mod error;

use std::fmt;

use bytes::Bytes;
pub use error::TransportError;
use tracing::{debug, trace};

use crate::{Command, Error, Response};

/// Trait for basic card transports
///
/// A transport is responsible for sending and receiving raw APDU bytes.
/// It has no knowledge of command structure, secure channels, or protocol details.
pub trait CardTransport: Send + Sync + fmt::Debug {
    /// Send raw APDU bytes to card and return response bytes
    fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        trace!(command = %hex::encode(command), "Transmitting raw command");
        let result = self.do_transmit_raw(command);
        match &result {
            Ok(response) => {
                trace!(response = %hex::encode(response), "Received raw response");
            }
            Err(e) => {
                debug!(error = ?e, "Transport error during transmission");
            }
        }
        result
    }

    /// Internal implementation of transmit_raw
    /// This is the method that concrete implementations should override
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError>;

    /// Reset the transport connection
    fn reset(&mut self) -> Result<(), TransportError>;

    /// Send a command and parse the raw reply into a [`Response`]
    fn transmit(&mut self, command: &Command) -> Result<Response, Error> {
        let response = self.transmit_raw(&command.to_bytes()?)?;
        Ok(Response::from_bytes(&response)?)
    }
}

impl<T: CardTransport + ?Sized> CardTransport for &mut T {
    fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        (**self).transmit_raw(command)
    }

    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        (**self).do_transmit_raw(command)
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        (**self).reset()
    }

    fn transmit(&mut self, command: &Command) -> Result<Response, Error> {
        (**self).transmit(command)
    }
}

#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct MockTransport {
    /// Mock responses to return, in order
    pub(crate) responses: Vec<Bytes>,
    /// Commands that were sent
    pub(crate) commands: Vec<Bytes>,
}

#[cfg(test)]
impl MockTransport {
    pub(crate) fn new(responses: Vec<Bytes>) -> Self {
        Self {
            responses,
            commands: Vec::new(),
        }
    }
}

#[cfg(test)]
impl CardTransport for MockTransport {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        self.commands.push(Bytes::copy_from_slice(command));

        if self.responses.is_empty() {
            return Err(TransportError::Transmission);
        }
        Ok(self.responses.remove(0))
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        self.commands.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transmit_parses_response() {
        let mut transport = MockTransport::new(vec![Bytes::from_static(&[0x01, 0x90, 0x00])]);
        let response = transport
            .transmit(&Command::new(0x80, 0x11, 0x00, 0x00))
            .unwrap();

        assert!(response.is_success());
        assert_eq!(response.payload().as_ref(), &[0x01]);
        assert_eq!(transport.commands[0].as_ref(), &[0x80, 0x11, 0x00, 0x00]);
    }

    #[test]
    fn test_transport_errors_propagate_unchanged() {
        let mut transport = MockTransport::default();
        let err = transport
            .transmit(&Command::new(0x80, 0x11, 0x00, 0x00))
            .unwrap_err();
        assert_eq!(err, Error::Transport(TransportError::Transmission));
    }

    #[test]
    fn test_mut_ref_is_a_transport() {
        fn send<T: CardTransport>(mut transport: T) -> Response {
            transport
                .transmit(&Command::new(0x00, 0xA4, 0x04, 0x00))
                .unwrap()
        }

        let mut transport = MockTransport::new(vec![Bytes::from_static(&[0x6A, 0x82])]);
        let response = send(&mut transport);
        assert!(response.status().is_file_not_found());
        assert_eq!(transport.commands.len(), 1);
    }

    #[test]
    fn test_oversized_command_is_not_sent() {
        let mut transport = MockTransport::new(vec![Bytes::from_static(&[0x90, 0x00])]);
        let command = Command::new_with_data(0x80, 0xE0, 0x00, 0x00, vec![0u8; 300]);

        assert_eq!(
            transport.transmit(&command).unwrap_err(),
            Error::DataTooLong(300)
        );
        assert!(transport.commands.is_empty());
    }
}
