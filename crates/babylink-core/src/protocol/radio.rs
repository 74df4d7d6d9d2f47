//! Radio (Bluetooth LE) provisioning format.
//!
//! The unit exposes one GATT service with two characteristics:
//!
//! - **networks** (read): `name1|name2|...`
//! - **credentials** (write with response): `<ssid>|<password>\n`
//!
//! # Value encoding
//!
//! On the air both values are plain UTF-8 bytes; the firmware reads the
//! credentials with `readStringUntil('\n')`.  Some central stacks (mobile
//! BLE libraries in particular) surface values to the application as base64
//! text and decode it again on write.  [`CharacteristicEncoding`] names which
//! view a central gives: [`CharacteristicEncoding::Raw`] for stacks that
//! exchange bytes directly, [`CharacteristicEncoding::Base64`] for the others.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::trace;
use uuid::Uuid;

use super::framing::split_pipe_list;
use super::ProtocolError;
use crate::domain::network::{Credentials, NetworkList};

/// Provisioning GATT service.
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x4fafc201_1fb5_459e_8fcc_c5c9c331914b);

/// Read-only characteristic listing the networks the unit can see.
pub const NETWORKS_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x86d38e23_747e_461b_94c6_4e5f726715d2);

/// Write characteristic accepting the credentials payload.
pub const CREDENTIALS_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0xbeb5483e_36e1_4688_b7f5_ea07361b26a8);

/// MTU requested when connecting; the firmware only supports the BLE minimum.
pub const REQUESTED_MTU: u16 = 23;

/// Advertised-name fragments identifying BabyLink hardware.
pub const DEFAULT_NAME_ALLOW_LIST: [&str; 4] = ["BTstack", "Shield", "Pico", "Baby"];

/// How characteristic values are represented between the app and the unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacteristicEncoding {
    /// The central exchanges the plain UTF-8 bytes.
    #[default]
    Raw,
    /// The central surfaces values as base64 text.
    Base64,
}

/// Returns `true` if `advertised_name` contains any allow-list fragment.
pub fn matches_allow_list<S: AsRef<str>>(advertised_name: &str, allow_list: &[S]) -> bool {
    allow_list
        .iter()
        .any(|fragment| advertised_name.contains(fragment.as_ref()))
}

/// Decodes the networks characteristic into a de-duplicated list.
///
/// # Errors
///
/// - [`ProtocolError::InvalidBase64`] / [`ProtocolError::InvalidUtf8`] when
///   the value cannot be decoded.
/// - [`ProtocolError::EmptyNetworkList`] when no usable name remains; the
///   session cannot proceed without a target network.
pub fn decode_network_list(
    value: &[u8],
    encoding: CharacteristicEncoding,
) -> Result<NetworkList, ProtocolError> {
    let text = decode_text(value, encoding)?;
    trace!("networks characteristic decoded to {text:?}");

    let networks = split_pipe_list(&text);
    if networks.is_empty() {
        return Err(ProtocolError::EmptyNetworkList);
    }
    Ok(networks)
}

/// Builds the value written to the credentials characteristic.
pub fn encode_credentials(credentials: &Credentials, encoding: CharacteristicEncoding) -> Vec<u8> {
    let raw = format!("{}\n", credentials.to_pipe_payload());
    match encoding {
        CharacteristicEncoding::Base64 => STANDARD.encode(raw).into_bytes(),
        CharacteristicEncoding::Raw => raw.into_bytes(),
    }
}

fn decode_text(value: &[u8], encoding: CharacteristicEncoding) -> Result<String, ProtocolError> {
    let bytes = match encoding {
        CharacteristicEncoding::Base64 => {
            let trimmed = trim_padding_bytes(value);
            STANDARD
                .decode(trimmed)
                .map_err(|e| ProtocolError::InvalidBase64(e.to_string()))?
        }
        CharacteristicEncoding::Raw => trim_padding_bytes(value).to_vec(),
    };
    String::from_utf8(bytes).map_err(|_| ProtocolError::InvalidUtf8)
}

/// Strips trailing NULs and ASCII whitespace some firmware builds leave in the value.
fn trim_padding_bytes(value: &[u8]) -> &[u8] {
    let end = value
        .iter()
        .rposition(|b| *b != 0 && !b.is_ascii_whitespace())
        .map_or(0, |i| i + 1);
    &value[..end]
}
