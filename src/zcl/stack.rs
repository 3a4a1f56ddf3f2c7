//! Interfaces consumed from the Zigbee protocol stack.

use super::{AttrValue, ClusterRole, OutgoingFrame};
use crate::error::Error;

/// Outcome of a transmission, reported through the completion callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendStatus {
    /// The frame left the device (and was acknowledged, where applicable).
    Delivered,
    /// The stack gave up on the frame.
    Failed,
}

/// Outbound send primitive of the protocol stack.
///
/// Implementations frame the command, hand it to the network layer and,
/// later, report completion by passing `frame.token` back to the owner of the
/// transaction together with a [`SendStatus`].
pub trait ZclStack {
    /// Queue a cluster-specific command for transmission.
    fn send_command(&mut self, frame: &OutgoingFrame<'_>) -> Result<(), Error>;
}

/// Read side of the stack's attribute table.
pub trait AttributeStore {
    /// Look up an attribute of a cluster instance on `endpoint`.
    fn read_attribute(
        &self,
        endpoint: u8,
        cluster_id: u16,
        role: ClusterRole,
        attr_id: u16,
    ) -> Option<AttrValue>;
}
