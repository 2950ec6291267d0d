//! Fixed-offset decoders for vendor status replies.
//!
//! Every reply is a single short frame; the interesting fields sit at
//! offsets fixed by the vendor's response layout. The offsets below are
//! protocol constants and must never be derived from the payload.

use crate::types::PowerState;
use crate::{command, Error, Result};

/// Byte carrying the power state in a QUERY_POWER_STATUS reply.
const POWER_STATUS_OFFSET: usize = 7;
const POWER_STATUS_MIN_LEN: usize = 8;

/// Temperature and lamp replies carry a little-endian u32 at this offset.
const VALUE_FIELD_OFFSET: usize = 7;
const VALUE_FIELD_LEN: usize = 4;
const TEMPERATURE_MIN_LEN: usize = 14;
const LAMP_HOURS_MIN_LEN: usize = 12;

/// Decodes a power status reply. A reply shorter than the status field is
/// an error; an unknown status byte maps to `Unavailable`.
pub fn power_status(response: &str) -> Result<PowerState> {
    let bytes = command::encode_frame(response)?;
    if bytes.len() < POWER_STATUS_MIN_LEN {
        return Err(Error::Decode(format!(
            "power status reply too short: {} bytes",
            bytes.len()
        )));
    }

    Ok(match bytes[POWER_STATUS_OFFSET] {
        0x00 | 0x03 => PowerState::Off,
        0x01 | 0x02 => PowerState::On,
        _ => PowerState::Unavailable,
    })
}

/// Temperature in degrees Celsius with one decimal of precision, or `None`
/// when the reply is unusable.
pub fn temperature(response: &str) -> Option<f32> {
    value_field(response, TEMPERATURE_MIN_LEN).map(|raw| raw as f32 / 10.0)
}

/// Lamp usage in whole hours, or `None` when the reply is unusable.
pub fn lamp_hours(response: &str) -> Option<u32> {
    value_field(response, LAMP_HOURS_MIN_LEN)
}

fn value_field(response: &str, min_len: usize) -> Option<u32> {
    let bytes = command::encode_frame(response).ok()?;
    if bytes.len() < min_len {
        return None;
    }

    let field: [u8; VALUE_FIELD_LEN] = bytes
        [VALUE_FIELD_OFFSET..VALUE_FIELD_OFFSET + VALUE_FIELD_LEN]
        .try_into()
        .ok()?;
    Some(u32::from_le_bytes(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_power_on() {
        let state = power_status("05 14 00 03 00 00 00 02 19").unwrap();

        assert_eq!(state, PowerState::On);
    }

    #[test]
    fn maps_every_power_status_byte() {
        assert_eq!(
            power_status("05 14 00 03 00 00 00 00 19").unwrap(),
            PowerState::Off
        );
        assert_eq!(
            power_status("05 14 00 03 00 00 00 01 19").unwrap(),
            PowerState::On
        );
        assert_eq!(
            power_status("05 14 00 03 00 00 00 03 19").unwrap(),
            PowerState::Off
        );
        assert_eq!(
            power_status("05 14 00 03 00 00 00 7F 19").unwrap(),
            PowerState::Unavailable
        );
    }

    #[test]
    fn short_power_reply_is_fatal() {
        let err = power_status("05 14 00 03").unwrap_err();

        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn empty_power_reply_is_fatal() {
        assert!(power_status("").is_err());
    }

    #[test]
    fn decodes_temperature_with_one_decimal() {
        let celsius = temperature("05 14 00 0A 00 00 00 29 01 00 00 00 00 00 00 48");

        assert_eq!(celsius, Some(29.7));
    }

    #[test]
    fn short_temperature_reply_is_unavailable() {
        assert_eq!(temperature("05 14 00 0A 00 00 00 29 01 00 00"), None);
    }

    #[test]
    fn decodes_lamp_hours_unscaled() {
        let hours = lamp_hours("05 14 00 06 00 00 00 B8 0B 00 00 DD");

        assert_eq!(hours, Some(3000));
    }

    #[test]
    fn short_lamp_reply_is_unavailable() {
        assert_eq!(lamp_hours("05 14 00 06 00 00 00 B8 0B"), None);
    }

    #[test]
    fn malformed_hex_is_unavailable_for_value_fields() {
        assert_eq!(temperature("not hex at all"), None);
        assert_eq!(lamp_hours("zz"), None);
    }
}
