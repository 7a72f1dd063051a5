//! Conversions from raw response bytes to register values and typed fields.
//!
//! Nothing in here fails on missing data: every accessor falls back to a
//! documented zero/empty value when an address isn't present in the map.

use crate::prelude::*;

use nom::{multi::many0, number::complete::be_u16, IResult};
use std::collections::BTreeMap;

/// Every response starts with a header we don't interpret.
pub const HEADER_LEN: usize = 5;

/// Number of bit positions in each error/warning table (8 registers of 16 bits).
pub const CODE_TABLE_SLOTS: usize = 128;

fn words(input: &[u8]) -> IResult<&[u8], Vec<u16>> {
    many0(be_u16)(input)
}

/// Split a payload into big-endian 16-bit values. A trailing odd byte is dropped.
pub fn value_stream(payload: &[u8]) -> Vec<u16> {
    words(payload).map(|(_, values)| values).unwrap_or_default()
}

/// The part of a response following the header; empty when there is no payload.
pub fn payload(data: &[u8]) -> &[u8] {
    data.get(HEADER_LEN..).unwrap_or(&[])
}

// CodeTable {{{
/// Messages for each bit position of an error/warning bitmask spanning consecutive registers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeTable(Vec<Option<String>>);

impl Default for CodeTable {
    fn default() -> Self {
        Self::with_slots(CODE_TABLE_SLOTS)
    }
}

impl CodeTable {
    pub fn with_slots(slots: usize) -> Self {
        Self(vec![None; slots])
    }

    pub fn from_entries(entries: &BTreeMap<usize, String>) -> Result<Self> {
        let mut table = Self::default();
        for (&index, message) in entries {
            table.set(index, message.clone())?;
        }
        Ok(table)
    }

    pub fn set(&mut self, index: usize, message: String) -> Result<()> {
        match self.0.get_mut(index) {
            Some(slot) => {
                *slot = Some(message);
                Ok(())
            }
            None => bail!(
                "codec.rs:code table index {} out of range (0..{})",
                index,
                self.0.len()
            ),
        }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).and_then(|m| m.as_deref())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// How many consecutive registers this table covers.
    pub fn register_count(&self) -> usize {
        self.0.len() / 16
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CodeTables {
    pub inverter_error: CodeTable,
    pub inverter_warning: CodeTable,
    pub charger_error: CodeTable,
    pub charger_warning: CodeTable,
}
// }}}

// RegisterMap {{{
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegisterMap {
    registers: BTreeMap<u16, u16>,
}

impl RegisterMap {
    /// Number consecutive words of `payload` from `base` upwards.
    ///
    /// Fails only if the words don't fit in the 16-bit address space above `base`.
    pub fn from_payload(base: u16, payload: &[u8]) -> Result<Self> {
        let values = value_stream(payload);
        let mut registers = BTreeMap::new();

        for (offset, value) in values.into_iter().enumerate() {
            let address = u16::try_from(offset)
                .ok()
                .and_then(|offset| base.checked_add(offset))
                .ok_or_else(|| {
                    anyhow!(
                        "codec.rs:register {} + {} overflows the address space",
                        base,
                        offset
                    )
                })?;
            registers.insert(address, value);
        }

        Ok(Self { registers })
    }

    /// Like `from_payload`, after discarding the response header.
    pub fn from_response(base: u16, data: &[u8]) -> Result<Self> {
        Self::from_payload(base, payload(data))
    }

    pub fn get(&self, address: u16) -> Option<u16> {
        self.registers.get(&address).copied()
    }

    pub fn contains(&self, address: u16) -> bool {
        self.registers.contains_key(&address)
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    fn get_offset(&self, address: u16, offset: u16) -> Option<u16> {
        address.checked_add(offset).and_then(|a| self.get(a))
    }

    pub fn int16(&self, address: u16) -> i16 {
        self.get(address).map(|v| v as i16).unwrap_or(0)
    }

    pub fn uint16(&self, address: u16) -> u16 {
        self.get(address).unwrap_or(0)
    }

    /// `int16(address) / scale`; a scale of 10 turns decivolts into volts and so on.
    pub fn scaled(&self, address: u16, scale: f64) -> f64 {
        f64::from(self.int16(address)) / scale
    }

    pub fn version(&self, address: u16) -> String {
        match self.get(address) {
            Some(v) => format!("{}.{}.{}", v / 10000, (v / 100) % 100, v % 100),
            None => "0.0.0".to_string(),
        }
    }

    /// Energy counter split over a coarse (MWh-ish) and a fine (0.1 kWh) register.
    pub fn accumulated_kwh(&self, address: u16) -> f64 {
        match (self.get(address), self.get_offset(address, 1)) {
            (Some(coarse), Some(fine)) => f64::from(coarse) * 1000.0 + f64::from(fine) * 0.1,
            _ => 0.0,
        }
    }

    /// Hours, minutes and seconds in three consecutive registers.
    pub fn time_seconds(&self, address: u16) -> u32 {
        match (
            self.get(address),
            self.get_offset(address, 1),
            self.get_offset(address, 2),
        ) {
            (Some(h), Some(m), Some(s)) => u32::from(h) * 3600 + u32::from(m) * 60 + u32::from(s),
            _ => 0,
        }
    }

    pub fn serial_number(&self, address: u16) -> u32 {
        match (self.get(address), self.get_offset(address, 1)) {
            (Some(high), Some(low)) => (u32::from(high) << 16) | u32::from(low),
            _ => 0,
        }
    }

    /// Two ASCII characters from the first register followed by the number in the second.
    pub fn model(&self, address: u16) -> String {
        match (self.get(address), self.get_offset(address, 1)) {
            (Some(letters), Some(number)) => {
                let [a, b] = letters.to_be_bytes();
                format!("{}{}{}", a as char, b as char, number)
            }
            _ => String::new(),
        }
    }

    /// Render the set bits of `table.register_count()` registers from `address` as messages.
    ///
    /// Lower registers come first, and bit 0 before bit 15 within a register.
    pub fn error_bits(&self, address: u16, table: &CodeTable) -> String {
        if !self.contains(address) {
            return "No errors".to_string();
        }

        let mut found = Vec::new();

        for i in 0..table.register_count() {
            let Some(value) = u16::try_from(i)
                .ok()
                .and_then(|i| self.get_offset(address, i))
            else {
                continue;
            };

            for bit in 0..16 {
                if value & (1 << bit) == 0 {
                    continue;
                }
                let index = i * 16 + bit;
                match table.get(index) {
                    Some(message) => {
                        debug!("error code {} found: {}", index, message);
                        found.push(message.to_string());
                    }
                    None => found.push(format!("Unknown error bit {}", index)),
                }
            }
        }

        if found.is_empty() {
            return "No errors".to_string();
        }

        debug!("errors found: {:?}", found);
        found.join(", ")
    }
}
// }}}
