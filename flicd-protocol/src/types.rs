//! Value types carried by commands and events

use core::fmt;
use core::str::FromStr;

use crate::codec::WireEnum;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Size of a name slot on the wire
pub const MAX_NAME_LEN: usize = 16;

/// Button name, colour or serial number as sent by the daemon
pub type Name = heapless::String<MAX_NAME_LEN>;

/// Declares a protocol enumeration whose wire value is its declaration index
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every variant, in wire order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
        }

        impl WireEnum for $name {
            const NAME: &'static str = stringify!($name);

            fn from_ordinal(ordinal: u8) -> Option<Self> {
                Self::ALL.get(ordinal as usize).copied()
            }

            fn ordinal(self) -> u8 {
                self as u8
            }
        }
    };
}

wire_enum! {
    /// Result code of a create connection channel command
    pub enum CreateConnectionChannelError {
        NoError,
        /// The daemon already tracks as many pending connections as it allows
        MaxPendingConnectionsReached,
    }
}

wire_enum! {
    /// Link state of a connection channel
    pub enum ConnectionStatus {
        Disconnected,
        /// Link up, button not verified yet
        Connected,
        /// Link up and verified; button events are live
        Ready,
    }
}

wire_enum! {
    /// Why a channel went to `Disconnected`
    pub enum DisconnectReason {
        Unspecified,
        ConnectionEstablishmentFailed,
        TimedOut,
        BondingKeysMismatch,
    }
}

wire_enum! {
    /// Why the daemon removed a connection channel
    pub enum RemovedReason {
        RemovedByThisClient,
        ForceDisconnectedByThisClient,
        ForceDisconnectedByOtherClient,
        ButtonIsPrivate,
        VerifyTimeout,
        InternetBackendError,
        InvalidData,
        CouldntLoadDevice,
    }
}

wire_enum! {
    /// Kind of button action reported by a button event
    pub enum ClickType {
        ButtonDown,
        ButtonUp,
        ButtonClick,
        ButtonSingleClick,
        ButtonDoubleClick,
        ButtonHold,
    }
}

wire_enum! {
    /// Bluetooth address kind of the daemon's controller
    pub enum BdAddrType {
        PublicBdAddrType,
        RandomBdAddrType,
    }
}

wire_enum! {
    /// Connection latency / power trade-off requested for a channel
    pub enum LatencyMode {
        NormalLatency,
        LowLatency,
        HighLatency,
    }
}

wire_enum! {
    /// State of the daemon's Bluetooth controller
    pub enum BluetoothControllerState {
        Detached,
        Resetting,
        Attached,
    }
}

wire_enum! {
    /// Outcome of a scan wizard
    pub enum ScanWizardResult {
        WizardSuccess,
        WizardCancelledByUser,
        WizardFailedTimeout,
        WizardButtonIsPrivate,
        WizardBluetoothUnavailable,
        WizardInternetBackendError,
        WizardInvalidData,
    }
}

impl Default for LatencyMode {
    fn default() -> Self {
        LatencyMode::NormalLatency
    }
}

impl ConnectionStatus {
    /// True for `Connected` and `Ready`
    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionStatus::Connected | ConnectionStatus::Ready)
    }
}

impl ScanWizardResult {
    pub fn is_success(self) -> bool {
        self == ScanWizardResult::WizardSuccess
    }
}

/// Bluetooth device address
///
/// Stored exactly as it travels on the wire. The printed form lists the
/// bytes in reverse wire order, e.g. wire `ff ee dd cc bb aa` prints as
/// `aa:bb:cc:dd:ee:ff`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BdAddr([u8; 6]);

impl BdAddr {
    /// Wrap six bytes in wire order
    pub const fn from_bytes(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Wire-order bytes
    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[5], b[4], b[3], b[2], b[1], b[0]
        )
    }
}

impl fmt::Debug for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BdAddr({})", self)
    }
}

/// Error parsing a colon-hex device address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseBdAddrError;

impl fmt::Display for ParseBdAddrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected six colon-separated hex bytes")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseBdAddrError {}

impl FromStr for BdAddr {
    type Err = ParseBdAddrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let mut parts = s.split(':');
        // Printed order is reversed wire order
        for slot in bytes.iter_mut().rev() {
            let part = parts.next().ok_or(ParseBdAddrError)?;
            if part.len() != 2 {
                return Err(ParseBdAddrError);
            }
            *slot = u8::from_str_radix(part, 16).map_err(|_| ParseBdAddrError)?;
        }
        if parts.next().is_some() {
            return Err(ParseBdAddrError);
        }
        Ok(Self(bytes))
    }
}

#[cfg(feature = "serde")]
impl Serialize for BdAddr {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for BdAddr {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BdAddrVisitor;

        impl serde::de::Visitor<'_> for BdAddrVisitor {
            type Value = BdAddr;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a bluetooth address like \"aa:bb:cc:dd:ee:ff\"")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<BdAddr, E> {
                v.parse().map_err(|_| E::custom(ParseBdAddrError))
            }
        }

        deserializer.deserialize_str(BdAddrVisitor)
    }
}

/// 128-bit button identifier assigned at verification
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ButtonUuid([u8; 16]);

impl ButtonUuid {
    /// Wrap raw bytes; the all-zero value means "unknown" and yields `None`
    pub fn from_bytes(bytes: [u8; 16]) -> Option<Self> {
        if bytes == [0u8; 16] {
            None
        } else {
            Some(Self(bytes))
        }
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for ButtonUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ButtonUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ButtonUuid({})", self)
    }
}
