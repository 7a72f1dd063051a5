mod common;
use common::*;
use ups_bridge::prelude::*;

use std::collections::BTreeMap;

fn table(entries: &[(usize, &str)]) -> CodeTable {
    let entries: BTreeMap<usize, String> =
        entries.iter().map(|(i, m)| (*i, m.to_string())).collect();
    CodeTable::from_entries(&entries).unwrap()
}

#[test]
fn value_stream_is_big_endian_and_drops_odd_byte() {
    assert_eq!(codec::value_stream(&[0x08, 0xca, 0x01, 0xf4, 0xff]), vec![2250, 500]);
    assert_eq!(codec::value_stream(&[]), Vec::<u16>::new());
    assert_eq!(codec::value_stream(&[0x01]), Vec::<u16>::new());
}

#[test]
fn payload_skips_header() {
    let response = Factory::response(&[1, 2]);
    assert_eq!(codec::payload(&response), &[0, 1, 0, 2]);
    assert_eq!(codec::payload(&[1, 2, 3]), &[] as &[u8]);
    assert_eq!(codec::payload(&[1, 2, 3, 4, 5]), &[] as &[u8]);
}

#[test]
fn register_map_numbers_from_base() -> Result<()> {
    let map = RegisterMap::from_response(25201, &Factory::response(&[7, 8, 9]))?;

    assert_eq!(map.len(), 3);
    assert_eq!(map.get(25201), Some(7));
    assert_eq!(map.get(25203), Some(9));
    assert_eq!(map.get(25204), None);
    assert!(map.contains(25202));

    Ok(())
}

#[test]
fn register_map_rejects_address_overflow() {
    assert!(RegisterMap::from_payload(65535, &[0, 1]).is_ok());
    assert!(RegisterMap::from_payload(65535, &[0, 1, 0, 2]).is_err());
}

#[test]
fn typed_accessors() -> Result<()> {
    let map = RegisterMap::from_payload(
        10,
        &Factory::response(&[
            0xfff6, // 10: -10
            2305,   // 11
            10203,  // 12: version 1.2.3
            12,     // 13: kWh coarse
            345,    // 14: kWh fine
            1,      // 15: hours
            2,      // 16: minutes
            3,      // 17: seconds
            0x0001, // 18: serial high
            0x0002, // 19: serial low
            0x4550, // 20: "EP"
            2000,   // 21
        ])[5..],
    )?;

    assert_eq!(map.int16(10), -10);
    assert_eq!(map.uint16(10), 0xfff6);
    assert_eq!(map.scaled(11, 10.0), 230.5);
    assert_eq!(map.scaled(10, 10.0), -1.0);
    assert_eq!(map.version(12), "1.2.3");
    assert_eq!(map.accumulated_kwh(13), 12000.0 + 345.0 * 0.1);
    assert_eq!(map.time_seconds(15), 3723);
    assert_eq!(map.serial_number(18), 0x0001_0002);
    assert_eq!(map.model(20), "EP2000");

    Ok(())
}

#[test]
fn missing_registers_default() {
    let map = RegisterMap::default();

    assert_eq!(map.int16(1), 0);
    assert_eq!(map.uint16(1), 0);
    assert_eq!(map.scaled(1, 10.0), 0.0);
    assert_eq!(map.version(1), "0.0.0");
    assert_eq!(map.accumulated_kwh(1), 0.0);
    assert_eq!(map.time_seconds(1), 0);
    assert_eq!(map.serial_number(1), 0);
    assert_eq!(map.model(1), "");
}

#[test]
fn accumulated_kwh_needs_both_registers() -> Result<()> {
    let map = RegisterMap::from_payload(100, &[0, 5])?;
    assert_eq!(map.accumulated_kwh(100), 0.0);
    Ok(())
}

#[test]
fn error_bits_unknown_bit() -> Result<()> {
    let map = RegisterMap::from_payload(25261, &[0x00, 0x01])?;
    assert_eq!(
        map.error_bits(25261, &CodeTable::with_slots(32)),
        "Unknown error bit 0"
    );
    Ok(())
}

#[test]
fn error_bits_no_bits_set() -> Result<()> {
    let map = RegisterMap::from_payload(25261, &[0, 0, 0, 0])?;
    assert_eq!(map.error_bits(25261, &CodeTable::default()), "No errors");
    Ok(())
}

#[test]
fn error_bits_absent_register() {
    let map = RegisterMap::default();
    assert_eq!(map.error_bits(25261, &table(&[(0, "Fan fault")])), "No errors");
}

#[test]
fn error_bits_labels_in_register_then_bit_order() -> Result<()> {
    // register 0: bits 0 and 3; register 1: bit 1 (index 17)
    let map = RegisterMap::from_payload(500, &[0x00, 0x09, 0x00, 0x02])?;
    let table = table(&[(0, "Fan fault"), (17, "Over temperature")]);

    assert_eq!(
        map.error_bits(500, &table),
        "Fan fault, Unknown error bit 3, Over temperature"
    );

    Ok(())
}

#[test]
fn error_bits_stops_at_table_size() -> Result<()> {
    // a 16-slot table covers a single register
    let map = RegisterMap::from_payload(500, &[0x00, 0x00, 0x00, 0x01])?;
    assert_eq!(map.error_bits(500, &CodeTable::with_slots(16)), "No errors");
    Ok(())
}

#[test]
fn code_table_bounds() {
    let mut t = CodeTable::default();
    assert_eq!(t.len(), codec::CODE_TABLE_SLOTS);
    assert_eq!(t.register_count(), 8);
    assert!(t.set(127, "last".to_string()).is_ok());
    assert!(t.set(128, "too far".to_string()).is_err());
    assert_eq!(t.get(127), Some("last"));
    assert_eq!(t.get(0), None);
    assert_eq!(t.get(500), None);
}
