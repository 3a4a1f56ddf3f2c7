//! Common error types for cluster command processing

/// A common error type for the Modbus cluster glue.
///
/// Every variant is recoverable: callers log it, drop the affected command and
/// release whatever slot it held. Nothing here aborts the device.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// No free slot was left in the pool at admission time.
    PoolExhausted,
    /// The dispatch queue already holds its maximum number of commands.
    QueueFull,
    /// The incoming payload was malformed or its declared length was out of range.
    ParseFailure,
    /// A response transmission stayed outstanding past the send timeout.
    SendTimeout,
    /// The command id is not handled by this cluster.
    UnknownCommand,
    /// The frame was addressed to another cluster or travelled the wrong direction.
    NotForCluster,
    /// The scheduler had no room left for another callback or alarm.
    SchedulerFull,
    /// The protocol stack refused to transmit a frame.
    SendFailed,
    /// An attribute write carried a value outside its permitted range.
    InvalidValue,
    /// A fixed-size buffer was too small for the data written into it.
    BufferOverflow,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::PoolExhausted => defmt::write!(f, "PoolExhausted"),
            Error::QueueFull => defmt::write!(f, "QueueFull"),
            Error::ParseFailure => defmt::write!(f, "ParseFailure"),
            Error::SendTimeout => defmt::write!(f, "SendTimeout"),
            Error::UnknownCommand => defmt::write!(f, "UnknownCommand"),
            Error::NotForCluster => defmt::write!(f, "NotForCluster"),
            Error::SchedulerFull => defmt::write!(f, "SchedulerFull"),
            Error::SendFailed => defmt::write!(f, "SendFailed"),
            Error::InvalidValue => defmt::write!(f, "InvalidValue"),
            Error::BufferOverflow => defmt::write!(f, "BufferOverflow"),
        }
    }
}
