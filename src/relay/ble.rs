//! BLE notification transport
//!
//! The BLE stack itself (advertising, pairing, GATT tables) lives outside
//! this crate. It is reached through [`BleLink`], which reports the link
//! state and the negotiated ATT MTU and queues notifications on the TX
//! characteristic.

use crate::{Result, config::BLE_MIN_MTU, error::GnssRelayError, relay::Transport};

/// Bytes of every ATT notification taken by the opcode and handle
pub const ATT_HEADER_LEN: usize = 3;

/// Boundary to the BLE stack
pub trait BleLink {
    /// A central is connected
    fn is_connected(&self) -> bool;

    /// The central enabled notifications on the TX characteristic (CCCD)
    fn notifications_enabled(&self) -> bool;

    /// ATT MTU negotiated for the current connection
    fn mtu(&self) -> u16;

    /// Queues one notification
    fn notify(&mut self, payload: &[u8]) -> Result<()>;
}

/// [`Transport`] over a [`BleLink`]
#[derive(Debug)]
pub struct BleTransport<L> {
    link: L,
}

impl<L: BleLink> BleTransport<L> {
    pub fn new(link: L) -> Self {
        BleTransport { link }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn into_inner(self) -> L {
        self.link
    }
}

/// Notification payload that fits a given ATT MTU
pub fn payload_for_mtu(mtu: u16) -> usize {
    usize::from(mtu.max(BLE_MIN_MTU)) - ATT_HEADER_LEN
}

impl<L: BleLink> Transport for BleTransport<L> {
    fn name(&self) -> &'static str {
        "ble"
    }

    fn is_ready(&self) -> bool {
        self.link.is_connected() && self.link.notifications_enabled()
    }

    fn max_payload(&self) -> usize {
        payload_for_mtu(self.link.mtu())
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.is_ready() {
            return Err(GnssRelayError::TransportError("BLE notifications not enabled"));
        }
        if data.len() > self.max_payload() {
            return Err(GnssRelayError::TransportError("payload exceeds ATT MTU"));
        }
        self.link.notify(data)
    }
}
