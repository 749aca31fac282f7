pub mod protocol;

pub mod link {
    use crate::protocol::{Command, LinkStatus};
    use embedded_hal::delay::DelayNs;
    use embedded_hal::spi::{Error as _, ErrorKind, SpiDevice};
    use std::time::Duration;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
    pub enum LinkError {
        /// The SPI device failed the transfer (timeout, disconnect, bus fault)
        #[error("link transport failure: {0:?}")]
        Transport(ErrorKind),
    }

    /// Half-duplex single-byte request/response channel to the motor board.
    ///
    /// Implementations hold no protocol state between calls; retry policy is the
    /// caller's job.
    pub trait Transport {
        /// Send one byte, return the byte clocked back in the same transfer.
        fn transact(&mut self, byte: u8) -> Result<u8, LinkError>;

        /// Pause before a transaction that the board needs time to prepare for.
        fn settle(&mut self, _duration: Duration) {}

        fn send(&mut self, command: Command) -> Result<LinkStatus, LinkError> {
            self.transact(command.to_byte()).map(LinkStatus::from_byte)
        }
    }

    pub struct Link<SPI, D> {
        spi: SPI,
        delay: D,
    }

    impl<SPI, D> Link<SPI, D>
    where
        SPI: SpiDevice,
        D: DelayNs,
    {
        pub fn new(spi: SPI, delay: D) -> Link<SPI, D> {
            Link { spi, delay }
        }

        /// Hand the bus and delay back, e.g. on shutdown.
        pub fn release(self) -> (SPI, D) {
            (self.spi, self.delay)
        }
    }

    impl<SPI, D> Transport for Link<SPI, D>
    where
        SPI: SpiDevice,
        D: DelayNs,
    {
        fn transact(&mut self, byte: u8) -> Result<u8, LinkError> {
            let mut buf = [byte];
            self.spi
                .transfer_in_place(&mut buf)
                .map_err(|e| LinkError::Transport(e.kind()))?;
            log::trace!("link: sent {} received {}", byte, buf[0]);
            Ok(buf[0])
        }

        fn settle(&mut self, duration: Duration) {
            self.delay
                .delay_ms(u32::try_from(duration.as_millis()).unwrap_or(u32::MAX));
        }
    }

}

pub use link::{Link, LinkError, Transport};
pub use protocol::{Command, LinkStatus};
