//! Scenario tests: cable lifecycle, supply collapse, faults, watchdog.

use max77665_charger::registers::{
    BAT_BIT, BAT_DTLS_OVERCURRENT, BAT_DTLS_SHIFT, BYP_BIT, CHGIN_BIT, CHG_BIT, CHG_CNFG_00,
    CHG_CNFG_01, CHG_CNFG_06, CHG_CNFG_09, CHG_DTLS_01, CHG_INT_MASK, CHG_INT_OK,
    CURRENT_STEP_MA, DETBAT_BIT, MIN_CURRENT_LIMIT_MA, MODE_BUCK_ONLY, MODE_CHARGER_BUCK,
    MODE_OTG_BOOST, WDTCLR, WDTEN,
};
use max77665_charger::{ChargeMode, Charger, ChargerConfig, PowerPath};

use crate::mock_hw::{LeaseCounter, MockChip, NoopDelay, RecordingSink};

const ALL_OK: u8 = BYP_BIT | DETBAT_BIT | BAT_BIT | CHG_BIT | CHGIN_BIT;
const DEBOUNCE: u64 = 500;

struct Rig {
    charger: Charger,
    chip: MockChip,
    delay: NoopDelay,
    sink: RecordingSink,
    wake: LeaseCounter,
}

impl Rig {
    fn new(config: ChargerConfig, cables: &[&'static str]) -> Self {
        let charger = Charger::new(config);
        let mut chip = MockChip::new();
        for name in cables {
            assert!(charger.register_cable(name));
        }
        charger.initialize(&mut chip).unwrap();
        Self {
            charger,
            chip,
            delay: NoopDelay,
            sink: RecordingSink::default(),
            wake: LeaseCounter::default(),
        }
    }

    fn poll(&mut self, now_ms: u64) {
        self.charger.poll(
            &mut self.chip,
            &mut self.delay,
            &mut self.sink,
            &mut self.wake,
            now_ms,
        );
    }

    /// Attach a cable and run the debounce window out.
    fn attach(&mut self, name: &'static str, at_ms: u64) {
        assert!(self.charger.handle_cable_event(name, true, at_ms));
        self.poll(at_ms + DEBOUNCE);
    }
}

// ───────────────────────────────────────────────────────────────
// Cable lifecycle
// ───────────────────────────────────────────────────────────────

#[test]
fn usb_attach_starts_charging_at_500ma() {
    let mut rig = Rig::new(ChargerConfig::default(), &["USB"]);

    assert!(rig.charger.handle_cable_event("USB", true, 1_000));
    rig.poll(1_000 + DEBOUNCE - 1);
    assert_eq!(rig.charger.mode(), ChargeMode::Off); // still debouncing

    rig.poll(1_000 + DEBOUNCE);
    assert_eq!(rig.charger.mode(), ChargeMode::Charging);
    assert!(rig.charger.online(PowerPath::Usb));
    assert!(!rig.charger.online(PowerPath::Ac));
    assert_eq!(rig.charger.max_current_ma(), 500);
    assert!(rig.charger.watchdog_armed());
    assert_eq!(
        rig.chip.regs[CHG_CNFG_00 as usize],
        MODE_CHARGER_BUCK | WDTEN
    );
    // Cleared during enable, then the effective ceiling.
    assert_eq!(rig.sink.reports, vec![0, 500]);
}

#[test]
fn detach_disables_and_reports_zero() {
    let mut rig = Rig::new(ChargerConfig::default(), &["TA"]);
    rig.attach("TA", 0);
    assert_eq!(rig.charger.mode(), ChargeMode::Charging);
    assert!(rig.charger.online(PowerPath::Ac));
    rig.chip.set_charging(true);

    // Cable gone: the chip stops charging on its own, then the debounced
    // event arrives.
    rig.chip.set_charging(false);
    assert!(rig.charger.handle_cable_event("TA", false, 10_000));
    rig.poll(10_000 + DEBOUNCE);

    assert_eq!(rig.charger.mode(), ChargeMode::Off);
    assert_eq!(rig.charger.max_current_ma(), 0);
    assert!(!rig.charger.online(PowerPath::Ac));
    assert!(!rig.charger.online(PowerPath::Usb));
    assert!(!rig.charger.watchdog_armed());
    assert_eq!(rig.chip.regs[CHG_CNFG_00 as usize], MODE_BUCK_ONLY);
    assert_eq!(rig.sink.reports.last(), Some(&0));
}

#[test]
fn event_already_reflected_by_hardware_is_ignored() {
    let mut rig = Rig::new(ChargerConfig::default(), &["USB"]);

    // The chip is already charging when the (late) attach settles.
    rig.chip.set_charging(true);
    rig.charger.handle_cable_event("USB", true, 0);
    rig.poll(DEBOUNCE);

    assert_eq!(rig.charger.mode(), ChargeMode::Off);
    assert!(rig.sink.reports.is_empty());
    assert!(!rig.charger.watchdog_armed());
}

#[test]
fn usb_host_takes_priority_and_switches_to_reverse_boost() {
    let mut rig = Rig::new(ChargerConfig::default(), &["USB", "USB-Host"]);
    rig.attach("USB", 0);
    assert_eq!(rig.charger.mode(), ChargeMode::Charging);

    rig.attach("USB-Host", 10_000);
    assert_eq!(rig.charger.mode(), ChargeMode::ReverseBoost);
    assert_eq!(rig.chip.regs[CHG_CNFG_00 as usize], MODE_OTG_BOOST);
    // Boost draws nothing from the input; no supply path is online and
    // the charging watchdog no longer runs.
    assert_eq!(rig.charger.max_current_ma(), 0);
    assert!(!rig.charger.online(PowerPath::Usb));
    assert!(!rig.charger.online(PowerPath::Ac));
    assert!(!rig.charger.watchdog_armed());
    // The chip floors the readback at its minimum draw.
    assert_eq!(rig.sink.reports.last(), Some(&MIN_CURRENT_LIMIT_MA));
}

#[test]
fn reset_picks_up_cable_attached_before_start() {
    let mut rig = Rig::new(ChargerConfig::default(), &["TA"]);

    // Attach settles while the chip is already charging autonomously:
    // the event itself is a no-op, but the binding remembers the cable.
    rig.chip.set_charging(true);
    rig.charger.handle_cable_event("TA", true, 0);
    rig.poll(DEBOUNCE);
    assert_eq!(rig.charger.mode(), ChargeMode::Off);

    rig.charger
        .reset(&mut rig.chip, &mut rig.sink, 1_000)
        .unwrap();

    assert_eq!(rig.charger.mode(), ChargeMode::Charging);
    assert!(rig.charger.online(PowerPath::Ac));
    assert_eq!(rig.charger.max_current_ma(), 2000);
    assert!(rig.charger.watchdog_armed());
    assert_eq!(rig.sink.reports.last(), Some(&2000));
}

// ───────────────────────────────────────────────────────────────
// Supply collapse and recalibration
// ───────────────────────────────────────────────────────────────

#[test]
fn supply_collapse_recalibrates_the_ceiling() {
    let mut rig = Rig::new(ChargerConfig::default(), &["TA"]);
    rig.attach("TA", 0);
    assert_eq!(rig.charger.max_current_ma(), 2000);

    // The adapter can only sustain 300 mA; the input fault fires.
    rig.chip.supply_limit_ma = 300;
    rig.chip.regs[CHG_INT_OK as usize] = ALL_OK & !CHGIN_BIT;
    rig.charger.handle_interrupt(&mut rig.chip, 1_000);

    // Recalibration is deferred, not immediate.
    rig.poll(1_099);
    assert_eq!(rig.charger.max_current_ma(), 2000);

    rig.poll(1_100);
    let calibrated = rig.charger.max_current_ma();
    assert!(calibrated >= MIN_CURRENT_LIMIT_MA);
    assert!(calibrated < 300 + CURRENT_STEP_MA, "got {calibrated}");
    assert_eq!(calibrated % CURRENT_STEP_MA, 0);
    assert_eq!(rig.sink.reports.last(), Some(&calibrated));
    // Probe interrupt masking was rolled back.
    assert_eq!(rig.chip.regs[CHG_INT_MASK as usize], 0x00);
    // The register now holds what was reported.
    assert_eq!(
        u32::from(rig.chip.regs[CHG_CNFG_09 as usize]) * CURRENT_STEP_MA,
        calibrated
    );
}

#[test]
fn repeated_faults_schedule_one_recalibration() {
    let mut rig = Rig::new(ChargerConfig::default(), &["TA"]);
    rig.attach("TA", 0);

    rig.chip.supply_limit_ma = 300;
    rig.chip.regs[CHG_INT_OK as usize] = ALL_OK & !CHGIN_BIT;
    rig.charger.handle_interrupt(&mut rig.chip, 1_000);
    rig.charger.handle_interrupt(&mut rig.chip, 1_050);

    // The second interrupt must not push the deadline past the first.
    rig.poll(1_100);
    assert!(rig.charger.max_current_ma() < 2000);
}

// ───────────────────────────────────────────────────────────────
// Faults
// ───────────────────────────────────────────────────────────────

#[test]
fn battery_overcurrent_faults_are_counted() {
    let mut rig = Rig::new(ChargerConfig::default(), &["USB"]);
    assert_eq!(rig.charger.oc_count(), 0);

    rig.chip.regs[CHG_DTLS_01 as usize] |= BAT_DTLS_OVERCURRENT << BAT_DTLS_SHIFT;
    rig.chip.regs[CHG_INT_OK as usize] = ALL_OK & !BAT_BIT;
    rig.charger.handle_interrupt(&mut rig.chip, 1_000);
    rig.charger.handle_interrupt(&mut rig.chip, 2_000);

    assert_eq!(rig.charger.oc_count(), 2);
    // A battery fault alone does not trigger recalibration.
    rig.poll(10_000);
    assert_eq!(rig.charger.max_current_ma(), 0);
}

#[test]
fn without_battery_fault_handling_is_skipped() {
    let config = ChargerConfig {
        battery_present: false,
        ..ChargerConfig::default()
    };
    let mut rig = Rig::new(config, &["USB"]);
    // No battery: the charge profile was never primed.
    assert_eq!(rig.chip.regs[CHG_CNFG_01 as usize], 0x00);

    rig.attach("USB", 0);
    assert_eq!(rig.charger.mode(), ChargeMode::Charging);
    assert!(!rig.charger.watchdog_armed());

    rig.chip.regs[CHG_DTLS_01 as usize] |= BAT_DTLS_OVERCURRENT << BAT_DTLS_SHIFT;
    rig.chip.regs[CHG_INT_OK as usize] = ALL_OK & !(BAT_BIT | CHGIN_BIT);
    rig.charger.handle_interrupt(&mut rig.chip, 1_000);
    rig.poll(60_000);

    assert_eq!(rig.charger.oc_count(), 0);
    assert_eq!(rig.charger.max_current_ma(), 500); // no recalibration ran
}

// ───────────────────────────────────────────────────────────────
// Watchdog heartbeat
// ───────────────────────────────────────────────────────────────

#[test]
fn heartbeat_acknowledges_under_a_wake_lease() {
    let mut rig = Rig::new(ChargerConfig::default(), &["USB"]);
    rig.attach("USB", 0); // armed at t=500, first deadline t=40_500

    rig.poll(40_499);
    assert_eq!(rig.wake.acquired, 0);

    rig.poll(40_500);
    assert_eq!(rig.wake.acquired, 1);
    assert_eq!(rig.wake.released, 1);
    assert_eq!(rig.chip.last_write_to(CHG_CNFG_06), Some(WDTCLR));

    // Fixed 30 s interval after an acknowledgment.
    rig.poll(40_500 + 29_999);
    assert_eq!(rig.wake.acquired, 1);
    rig.poll(40_500 + 30_000);
    assert_eq!(rig.wake.acquired, 2);
}

#[test]
fn failed_acknowledgment_retries_on_the_next_poll() {
    let mut rig = Rig::new(ChargerConfig::default(), &["USB"]);
    rig.attach("USB", 0);

    rig.chip.fail_writes[CHG_CNFG_06 as usize] = true;
    rig.poll(40_500);
    assert_eq!(rig.wake.acquired, 1);

    rig.chip.fail_writes[CHG_CNFG_06 as usize] = false;
    rig.poll(40_501);
    assert_eq!(rig.chip.last_write_to(CHG_CNFG_06), Some(WDTCLR));
    // Every acquisition was paired with a release.
    assert_eq!(rig.wake.acquired, rig.wake.released);
    assert_eq!(rig.wake.acquired, 2);

    // Settled into the regular cadence afterwards.
    rig.poll(40_501 + 30_000);
    assert_eq!(rig.wake.acquired, 3);
}

// ───────────────────────────────────────────────────────────────
// Direct register surface
// ───────────────────────────────────────────────────────────────

#[test]
fn direct_ceiling_write_bypasses_calibration() {
    let mut rig = Rig::new(ChargerConfig::default(), &["USB"]);
    rig.charger
        .set_max_input_current(&mut rig.chip, 1500)
        .unwrap();
    assert_eq!(rig.charger.max_input_current(&mut rig.chip).unwrap(), 1500);
    assert!(rig.sink.reports.is_empty());
}
