//! Bus message decoding
//!
//! Devices on the two-wire room controller bus broadcast fixed-length status
//! packets. There is no request/response pairing here: a packet is decoded
//! against its own leading bytes, using the same table machinery as the
//! serial protocol but with symbolic identifiers.

use crate::engine::{DecodeEngine, DecodeResult};
use crate::field::FieldDecoder;
use crate::table::{CommandDecoder, DecoderTable};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Leading bytes of the main controller status packet, which opens each polling round
pub const ROUND_START_PREFIX: [u8; 3] = [0x40, 0x00, 0x10];

/// Leading bytes of the heat pump status reply
pub const STATUS_REPLY_PREFIX: [u8; 3] = [0x40, 0x00, 0x11];

/// Values broadcast on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusVariable {
    HeatingOn,
    CoolingOn,
    HeatingEnabled,
    LwtControl,
    DhwTank,
    DhwBooster,
    TargetDhwTemp,
    TargetRoomTemp,
    QuietMode,
    MainZone,
    AdditionalZone,
    DhwHeating,
    CompressorOn,
    PumpOn,
    DhwActive,
    ThreewayOnOff,
    ThreewayTank,
    LeavingWaterTemp,
    ReturnWaterTemp,
    DhwTankTemp,
}

impl BusVariable {
    /// Column-style name, e.g. `target_dhw_temp`
    pub fn name(self) -> &'static str {
        match self {
            BusVariable::HeatingOn => "heating_on",
            BusVariable::CoolingOn => "cooling_on",
            BusVariable::HeatingEnabled => "heating_enabled",
            BusVariable::LwtControl => "lwt_control",
            BusVariable::DhwTank => "dhw_tank",
            BusVariable::DhwBooster => "dhw_booster",
            BusVariable::TargetDhwTemp => "target_dhw_temp",
            BusVariable::TargetRoomTemp => "target_room_temp",
            BusVariable::QuietMode => "quiet_mode",
            BusVariable::MainZone => "main_zone",
            BusVariable::AdditionalZone => "additional_zone",
            BusVariable::DhwHeating => "dhw_heating",
            BusVariable::CompressorOn => "compressor_on",
            BusVariable::PumpOn => "pump_on",
            BusVariable::DhwActive => "dhw_active",
            BusVariable::ThreewayOnOff => "threeway_on_off",
            BusVariable::ThreewayTank => "threeway_tank",
            BusVariable::LeavingWaterTemp => "leaving_water_temp",
            BusVariable::ReturnWaterTemp => "return_water_temp",
            BusVariable::DhwTankTemp => "dhw_tank_temp",
        }
    }
}

impl fmt::Display for BusVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn entry(start: usize, decoder: FieldDecoder, variable: BusVariable) -> CommandDecoder {
    CommandDecoder::unlabelled(start, decoder, variable)
}

/// True for the main controller status packet that opens a polling round
///
/// Besides the leading bytes, the high nibble of the fourth byte must be zero.
pub fn is_round_start(packet: &[u8]) -> bool {
    packet.starts_with(&ROUND_START_PREFIX) && packet.get(3).map_or(false, |&b| b >> 4 == 0)
}

/// The bus decoder table, built on first use
pub fn bus_table() -> &'static DecoderTable {
    static TABLE: OnceLock<DecoderTable> = OnceLock::new();
    TABLE.get_or_init(|| {
        use BusVariable::*;
        use FieldDecoder::Bit;

        DecoderTable::from_pages(vec![
            (
                ROUND_START_PREFIX.to_vec(),
                vec![
                    entry(3, Bit(0), HeatingOn),
                    entry(4, Bit(0), CoolingOn),
                    entry(5, Bit(0), HeatingEnabled),
                    entry(5, Bit(7), LwtControl),
                    entry(6, Bit(0), DhwTank),
                    entry(6, Bit(1), DhwBooster),
                    entry(7, FieldDecoder::BYTE, TargetDhwTemp),
                    entry(9, FieldDecoder::BYTE, TargetRoomTemp),
                    entry(14, Bit(2), QuietMode),
                    entry(20, Bit(6), MainZone),
                    entry(20, Bit(7), AdditionalZone),
                ],
            ),
            (
                STATUS_REPLY_PREFIX.to_vec(),
                vec![
                    entry(3, Bit(0), DhwHeating),
                    entry(3, Bit(1), CompressorOn),
                    entry(3, Bit(3), PumpOn),
                    entry(3, Bit(6), DhwActive),
                    entry(4, Bit(0), ThreewayOnOff),
                    entry(4, Bit(1), ThreewayTank),
                    entry(5, FieldDecoder::WORD_FIXED_BE, LeavingWaterTemp),
                    entry(7, FieldDecoder::WORD_FIXED_BE, ReturnWaterTemp),
                    entry(9, FieldDecoder::WORD_FIXED_BE, DhwTankTemp),
                ],
            ),
        ])
    })
}

/// Decode one bus packet
pub fn decode_bus_message(message: &[u8]) -> DecodeResult<'static> {
    DecodeEngine::decode(message, message, bus_table())
}
