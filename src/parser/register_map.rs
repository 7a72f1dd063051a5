//! Fixed-offset decoder: the payload is read as a run of registers starting at a
//! bank's base address, and fields are picked out by address.

use crate::prelude::*;

pub const INVERTER_BASE: u16 = 25201;
pub const CHARGER_BASE: u16 = 15201;
pub const BATTERY_STATUS_BASE: u16 = 0;

// InverterBank {{{
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InverterBank {
    pub work_state: i16,
    pub ac_voltage_grade: i16,
    pub rated_power: i16,
    pub battery_voltage: f64,
    pub inverter_voltage: f64,
    pub grid_voltage: f64,
    pub bus_voltage: f64,
    pub control_current: f64,
    pub inverter_current: f64,
    pub grid_current: f64,
    pub load_current: f64,
    pub p_inverter: i16,
    pub p_grid: i16,
    pub p_load: i16,
    pub load_percent: i16,
    pub s_inverter: i16,
    pub s_grid: i16,
    pub s_load: i16,
    pub q_inverter: i16,
    pub q_grid: i16,
    pub q_load: i16,
    pub inverter_frequency: f64,
    pub grid_frequency: f64,
    pub inverter_max_number: u16,
    pub combine_type: u16,
    pub inverter_number: u16,
    pub ac_radiator_temperature: i16,
    pub transformer_temperature: i16,
    pub dc_radiator_temperature: i16,
    pub inverter_relay_state: i16,
    pub grid_relay_state: i16,
    pub load_relay_state: i16,
    pub n_line_relay_state: i16,
    pub dc_relay_state: i16,
    pub earth_relay_state: i16,
    pub accumulated_charger_power: f64,
    pub accumulated_discharger_power: f64,
    pub accumulated_buy_power: f64,
    pub accumulated_sell_power: f64,
    pub accumulated_load_power: f64,
    pub accumulated_self_use_power: f64,
    pub accumulated_pv_sell_power: f64,
    pub accumulated_grid_charger_power: f64,
    pub error_message: String,
    pub warning_message: String,
    pub battery_power: i16,
    pub battery_current: f64,
    pub rated_power_w: i16,
}

impl InverterBank {
    pub fn decode(r: &RegisterMap, tables: &CodeTables) -> Self {
        Self {
            work_state: r.int16(25201),
            ac_voltage_grade: r.int16(25202),
            rated_power: r.int16(25203),
            battery_voltage: r.scaled(25205, 10.0),
            inverter_voltage: r.scaled(25206, 10.0),
            grid_voltage: r.scaled(25207, 10.0),
            bus_voltage: r.scaled(25208, 10.0),
            control_current: r.scaled(25209, 10.0),
            inverter_current: r.scaled(25210, 10.0),
            grid_current: r.scaled(25211, 10.0),
            load_current: r.scaled(25212, 10.0),
            p_inverter: r.int16(25213),
            p_grid: r.int16(25214),
            p_load: r.int16(25215),
            load_percent: r.int16(25216),
            s_inverter: r.int16(25217),
            s_grid: r.int16(25218),
            s_load: r.int16(25219),
            q_inverter: r.int16(25221),
            q_grid: r.int16(25222),
            q_load: r.int16(25223),
            inverter_frequency: r.scaled(25225, 10.0),
            grid_frequency: r.scaled(25226, 10.0),
            inverter_max_number: r.uint16(25229),
            combine_type: r.uint16(25230),
            inverter_number: r.uint16(25231),
            ac_radiator_temperature: r.int16(25233),
            transformer_temperature: r.int16(25234),
            dc_radiator_temperature: r.int16(25235),
            inverter_relay_state: r.int16(25237),
            grid_relay_state: r.int16(25238),
            load_relay_state: r.int16(25239),
            n_line_relay_state: r.int16(25240),
            dc_relay_state: r.int16(25241),
            earth_relay_state: r.int16(25242),
            accumulated_charger_power: r.accumulated_kwh(25245),
            accumulated_discharger_power: r.accumulated_kwh(25247),
            accumulated_buy_power: r.accumulated_kwh(25249),
            accumulated_sell_power: r.accumulated_kwh(25251),
            accumulated_load_power: r.accumulated_kwh(25253),
            accumulated_self_use_power: r.accumulated_kwh(25255),
            accumulated_pv_sell_power: r.accumulated_kwh(25257),
            accumulated_grid_charger_power: r.accumulated_kwh(25259),
            error_message: r.error_bits(25261, &tables.inverter_error),
            warning_message: r.error_bits(25265, &tables.inverter_warning),
            battery_power: r.int16(25273),
            battery_current: r.scaled(25274, 10.0),
            rated_power_w: r.int16(25277),
        }
    }

    /// First nonzero of the AC radiator, transformer and DC radiator sensors.
    pub fn temperature(&self) -> i16 {
        [
            self.ac_radiator_temperature,
            self.transformer_temperature,
            self.dc_radiator_temperature,
        ]
        .into_iter()
        .find(|&t| t != 0)
        .unwrap_or(0)
    }
}
// }}}

// ChargerBank {{{
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChargerBank {
    pub work_state: i16,
    pub mppt_state: i16,
    pub charging_state: i16,
    pub pv_voltage: f64,
    pub battery_voltage: f64,
    pub charger_current: f64,
    pub charger_power: i16,
    pub radiator_temperature: i16,
    pub external_temperature: i16,
    pub battery_relay: i16,
    pub pv_relay: i16,
    pub error_message: String,
    pub warning_message: String,
    pub battery_voltage_grade: i16,
    pub rated_current: i16,
    pub accumulated_power: f64,
    pub accumulated_time: u32,
}

impl ChargerBank {
    pub fn decode(r: &RegisterMap, tables: &CodeTables) -> Self {
        Self {
            work_state: r.int16(15201),
            mppt_state: r.int16(15202),
            charging_state: r.int16(15203),
            pv_voltage: r.scaled(15205, 10.0),
            battery_voltage: r.scaled(15206, 10.0),
            charger_current: r.scaled(15207, 10.0),
            charger_power: r.int16(15208),
            radiator_temperature: r.int16(15209),
            external_temperature: r.int16(15210),
            battery_relay: r.int16(15211),
            pv_relay: r.int16(15212),
            error_message: r.error_bits(15213, &tables.charger_error),
            warning_message: r.error_bits(15214, &tables.charger_warning),
            battery_voltage_grade: r.int16(15215),
            rated_current: r.int16(15216),
            accumulated_power: r.accumulated_kwh(15217),
            accumulated_time: r.time_seconds(15219),
        }
    }
}
// }}}

// BatteryStatusBank {{{
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatteryStatusBank {
    pub state_of_charge: Option<u16>,
    pub state_of_health: Option<u16>,
}

impl BatteryStatusBank {
    pub fn decode(r: &RegisterMap) -> Self {
        Self {
            state_of_charge: r.get(113),
            state_of_health: r.get(114),
        }
    }
}
// }}}

#[derive(Clone, Debug, Default)]
pub struct RegisterMapParser {
    code_tables: CodeTables,
}

impl RegisterMapParser {
    pub fn new(code_tables: CodeTables) -> Self {
        Self { code_tables }
    }
}

impl Decode for RegisterMapParser {
    fn decode(&self, data: &[u8], capture: &Capture) -> Result<Telemetry> {
        if data.is_empty() {
            bail!("register_map.rs:empty response");
        }

        let mut telemetry = Telemetry::empty(capture);
        if data.len() < codec::HEADER_LEN {
            return Ok(telemetry);
        }

        let inverter = InverterBank::decode(
            &RegisterMap::from_response(INVERTER_BASE, data)?,
            &self.code_tables,
        );
        let charger = ChargerBank::decode(
            &RegisterMap::from_response(CHARGER_BASE, data)?,
            &self.code_tables,
        );
        let battery = BatteryStatusBank::decode(&RegisterMap::from_response(
            BATTERY_STATUS_BASE,
            data,
        )?);

        // inverter voltage is what goes out to the load; grid voltage is what comes in
        telemetry.output_voltage = inverter.inverter_voltage;
        telemetry.input_voltage = inverter.grid_voltage;
        telemetry.battery_voltage = inverter.battery_voltage;
        telemetry.load_percent = i32::from(inverter.load_percent);
        telemetry.load_power = i32::from(inverter.p_load);
        telemetry.frequency = inverter.grid_frequency;
        telemetry.input_frequency = inverter.grid_frequency;
        telemetry.temperature = i32::from(inverter.temperature());

        if charger.battery_voltage > 0.0 {
            telemetry.battery_voltage = charger.battery_voltage;
        }
        if charger.radiator_temperature > 0 {
            telemetry.temperature = i32::from(charger.radiator_temperature);
        }
        if let Some(soc) = battery.state_of_charge.filter(|&soc| soc > 0) {
            telemetry.battery_level = i32::from(soc);
        }

        telemetry.extended = Some(ExtendedTelemetry {
            grid_voltage: inverter.grid_voltage,
            bus_voltage: inverter.bus_voltage,
            inverter_current: inverter.inverter_current,
            grid_current: inverter.grid_current,
            load_current: inverter.load_current,
            inverter_power: i32::from(inverter.p_inverter),
            grid_power: i32::from(inverter.p_grid),
            work_state: i32::from(inverter.work_state),
            error_message: inverter.error_message,
            warning_message: inverter.warning_message,
        });

        Ok(telemetry.with_derived_status())
    }

    fn name(&self) -> &'static str {
        "register map"
    }
}
