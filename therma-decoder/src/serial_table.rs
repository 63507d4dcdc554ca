//! Native decoder table for the serial command/response protocol
//!
//! Variable numbers are the ones shown by the manufacturer's service tool.
//! Each page is read with the command `03 40 <page> <checksum>`.

use crate::field::FieldDecoder;
use crate::table::{CommandDecoder, DecoderTable};
use std::sync::OnceLock;

fn page(page: u8, decoders: Vec<CommandDecoder>) -> (Vec<u8>, Vec<CommandDecoder>) {
    (vec![3, 64, page], decoders)
}

fn d(start: usize, decoder: FieldDecoder, number: u32, label: &str) -> CommandDecoder {
    CommandDecoder::new(start, decoder, number, label)
}

/// The native table, built on first use
pub fn serial_table() -> &'static DecoderTable {
    static TABLE: OnceLock<DecoderTable> = OnceLock::new();
    TABLE.get_or_init(build_serial_table)
}

fn build_serial_table() -> DecoderTable {
    use FieldDecoder::{Bit, IuOperationMode, OperationMode};
    const BYTE: FieldDecoder = FieldDecoder::BYTE;
    const BYTE_10: FieldDecoder = FieldDecoder::BYTE_10;
    const WORD: FieldDecoder = FieldDecoder::WORD;
    const WORD_10: FieldDecoder = FieldDecoder::WORD_10;

    let table = DecoderTable::from_pages(vec![
        page(
            0x00,
            vec![
                d(14, BYTE, 20, "O/U MPU ID (yy)"),
                d(15, BYTE_10, 21, "O/U capacity (kW)"),
            ],
        ),
        page(
            0x10,
            vec![
                d(3, OperationMode, 22, "Operation Mode"),
                d(4, Bit(7), 23, "Thermostat ON/OFF"),
                d(4, Bit(6), 24, "Restart standby"),
                d(4, Bit(5), 25, "Startup control"),
                d(4, Bit(4), 26, "Defrost operation"),
                d(5, Bit(0), 27, "Oil return operation"),
                d(6, Bit(0), 28, "4 way valve"),
                d(9, BYTE, 30, "INV frequency (rps)"),
            ],
        ),
        page(
            0x11,
            vec![
                d(3, BYTE, 47, "O/U EEPROM (1st digit)"),
                d(4, BYTE, 48, "O/U EEPROM (3rd 4th digit)"),
                d(5, BYTE, 49, "O/U EEPROM (5th 6th digit)"),
                d(6, BYTE, 50, "O/U EEPROM (7th 8th digit)"),
                d(7, BYTE, 51, "O/U EEPROM (10th digit)"),
                d(8, BYTE, 52, "O/U EEPROM (11th digit)"),
            ],
        ),
        page(
            0x20,
            vec![
                d(3, WORD_10, 53, "Outdoor air temp.(R1T)(C)"),
                d(5, WORD_10, 54, "Heat exchanger mid-temp.(R2T)(C)"),
                d(7, WORD_10, 55, "Discharge pipe temp.(R3T)(C)"),
                d(11, WORD_10, 56, "Heat exchanger temp.(R5T)(C)"),
                d(15, WORD_10, 57, "Inverter fin temp.(C)"),
                d(17, WORD_10, 58, "Liquid pipe temp.(R6T)(C)"),
                d(19, BYTE, 59, "Fan 1 step"),
            ],
        ),
        page(
            0x21,
            vec![
                d(3, WORD_10, 62, "INV primary current (A)"),
                d(5, WORD_10, 63, "INV secondary current (A)"),
                d(7, BYTE, 65, "Voltage (N-phase) (V)"),
                d(10, BYTE, 67, "Expansion valve (pls/10)"),
            ],
        ),
        page(0x30, vec![d(6, WORD, 71, "Compressor operation time (h)")]),
        page(
            0x60,
            vec![
                d(3, Bit(7), 130, "I/U communication OK"),
                d(5, IuOperationMode, 135, "I/U operation mode"),
            ],
        ),
        page(
            0x61,
            vec![
                d(3, Bit(7), 143, "Space heating/cooling ON/OFF"),
                d(5, WORD_10, 144, "Leaving water temp. before BUH (R1T)(C)"),
                d(7, WORD_10, 145, "Leaving water temp. after BUH (R2T)(C)"),
                d(9, WORD_10, 146, "Refrig. Temp. liquid side (R3T)(C)"),
                d(11, WORD_10, 147, "Inlet water temp.(R4T)(C)"),
                d(13, WORD_10, 148, "DHW tank temp. (R5T)(C)"),
                d(15, WORD_10, 149, "Outdoor air temp.(R6T)(C)"),
            ],
        ),
        page(
            0x62,
            vec![
                d(5, Bit(4), 156, "Powerful DHW Operation. ON/OFF"),
                d(5, Bit(2), 153, "Reheat ON/OFF"),
                d(6, WORD_10, 168, "LW setpoint (Main)(C)"),
                d(8, WORD_10, 170, "RT setpoint (C)"),
                d(10, Bit(4), 166, "Main RT Heating"),
                d(12, WORD_10, 175, "Flow sensor (l/min)"),
                d(15, BYTE, 181, "Water pump signal (0:max-100:stop)"),
            ],
        ),
        page(
            0x63,
            vec![
                d(7, BYTE, 187, "Heat pump capacity (%)"),
                d(8, BYTE, 188, "Booster heater capacity (%)"),
                d(9, BYTE, 189, "Room temp. (C)"),
            ],
        ),
        page(
            0x64,
            vec![
                d(5, Bit(1), 190, "BUH step1"),
                d(5, Bit(2), 191, "BUH step2"),
            ],
        ),
    ]);

    let stats = table.stats();
    log::debug!(
        "Serial table built: {} pages, {} decoders",
        stats.num_prefixes,
        stats.num_decoders
    );
    table
}
