// Convenience command encodings, driven end-to-end through the simulator.

mod simulator;

use comfoconnect_rs::registry::properties::PROPERTY_SERIAL_NUMBER;
use comfoconnect_rs::{
    BalanceMode, BypassMode, ComfoConnect, DeviceUuid, PropertyValue, TemperatureProfile,
    VentilationMode, VentilationSpeed,
};
use simulator::{Simulator, SimulatorConfig};

fn app_uuid() -> DeviceUuid {
    "000000000000000000000000000000aa".parse().unwrap()
}

async fn unit_with_manual_rmi() -> (ComfoConnect, Simulator) {
    let sim = Simulator::start(SimulatorConfig {
        pre_registered: vec![app_uuid()],
        auto_rmi: None,
        ..Default::default()
    })
    .await;
    let unit = ComfoConnect::new(sim.endpoint(), app_uuid());
    unit.connect(Some(0)).await.unwrap();
    (unit, sim)
}

/// Expects one RMI request with the given bytes and answers it.
async fn answer(sim: &mut Simulator, expected: &[u8], response: &[u8]) {
    let capture = sim.next_rmi().await;
    assert_eq!(capture.node_id, 1);
    assert_eq!(capture.message, expected, "unexpected RMI request bytes");
    sim.send_rmi_response(capture.reference, response.to_vec())
        .await;
}

#[tokio::test]
async fn test_get_speed() {
    let (unit, mut sim) = unit_with_manual_rmi().await;
    let (speed, _) = tokio::join!(
        unit.get_speed(),
        answer(&mut sim, &[0x83, 0x15, 0x01], &[0x00, 0x01, 0x02]),
    );
    assert_eq!(speed.unwrap(), VentilationSpeed::Medium);
}

#[tokio::test]
async fn test_mode_property_accessors() {
    let (unit, mut sim) = unit_with_manual_rmi().await;

    let (mode, _) = tokio::join!(
        unit.get_mode(),
        answer(
            &mut sim,
            &[0x01, 0x1E, 0x01, 0x10, 0x08, 0x00],
            &[0x00, 0xFF],
        ),
    );
    assert_eq!(mode.unwrap(), VentilationMode::Auto);

    let (set, _) = tokio::join!(
        unit.set_mode(VentilationMode::Manual),
        answer(
            &mut sim,
            &[0x03, 0x1E, 0x01, 0x10, 0x08, 0x00, 0x01],
            &[0x00],
        ),
    );
    set.unwrap();
}

#[tokio::test]
async fn test_bypass_modes() {
    let (unit, mut sim) = unit_with_manual_rmi().await;

    // No override active means the damper follows its automatic program.
    let (bypass, _) = tokio::join!(
        unit.get_bypass(),
        answer(&mut sim, &[0x83, 0x15, 0x02], &[0x00, 0x00, 0x00]),
    );
    assert_eq!(bypass.unwrap(), BypassMode::Auto);

    let (set, _) = tokio::join!(
        unit.set_bypass(BypassMode::On, 3600),
        answer(
            &mut sim,
            &[0x84, 0x15, 0x02, 0x06, 0x10, 0x0E, 0x00, 0x00, 0x02],
            &[0x00],
        ),
    );
    set.unwrap();

    let (set, _) = tokio::join!(
        unit.set_bypass(BypassMode::Auto, 0),
        answer(&mut sim, &[0x85, 0x15, 0x02], &[0x00]),
    );
    set.unwrap();
}

#[tokio::test]
async fn test_boost() {
    let (unit, mut sim) = unit_with_manual_rmi().await;

    let (set, _) = tokio::join!(
        unit.set_boost(true, 600),
        answer(
            &mut sim,
            &[0x84, 0x15, 0x01, 0x06, 0x58, 0x02, 0x00, 0x00, 0x03],
            &[0x00],
        ),
    );
    set.unwrap();

    let (boost, _) = tokio::join!(
        unit.get_boost(),
        answer(&mut sim, &[0x83, 0x15, 0x01], &[0x00, 0x01, 0x03]),
    );
    assert!(boost.unwrap());

    let (set, _) = tokio::join!(
        unit.set_boost(false, 0),
        answer(&mut sim, &[0x85, 0x15, 0x01], &[0x00]),
    );
    set.unwrap();
}

#[tokio::test]
async fn test_temperature_profile() {
    let (unit, mut sim) = unit_with_manual_rmi().await;

    let (set, _) = tokio::join!(
        unit.set_temperature_profile(TemperatureProfile::Cool),
        answer(&mut sim, &[0x84, 0x15, 0x03, 0x02], &[0x00]),
    );
    set.unwrap();

    let (profile, _) = tokio::join!(
        unit.get_temperature_profile(),
        answer(&mut sim, &[0x83, 0x15, 0x03], &[0x00, 0x01, 0x00]),
    );
    assert_eq!(profile.unwrap(), TemperatureProfile::Warm);
}

#[tokio::test]
async fn test_balance_mode() {
    let (unit, mut sim) = unit_with_manual_rmi().await;

    // Supply override inactive, exhaust parked: supply-only ventilation.
    let (mode, _) = tokio::join!(unit.get_balance_mode(), async {
        answer(&mut sim, &[0x83, 0x15, 0x05], &[0x00, 0x00, 0x00]).await;
        answer(&mut sim, &[0x83, 0x15, 0x06], &[0x00, 0x01, 0x00]).await;
    });
    assert_eq!(mode.unwrap(), BalanceMode::SupplyOnly);

    // Going back to balance clears both fan overrides.
    let (set, _) = tokio::join!(unit.set_balance_mode(BalanceMode::Balance, 0), async {
        answer(&mut sim, &[0x85, 0x15, 0x05], &[0x00]).await;
        answer(&mut sim, &[0x85, 0x15, 0x06], &[0x00]).await;
    });
    set.unwrap();

    // Exhaust-only clears the exhaust override and parks the supply fan.
    let (set, _) = tokio::join!(
        unit.set_balance_mode(BalanceMode::ExhaustOnly, 1800),
        async {
            answer(&mut sim, &[0x85, 0x15, 0x06], &[0x00]).await;
            answer(
                &mut sim,
                &[0x84, 0x15, 0x05, 0x06, 0x08, 0x07, 0x00, 0x00, 0x00],
                &[0x00],
            )
            .await;
        }
    );
    set.unwrap();
}

#[tokio::test]
async fn test_sensor_ventmode_flags() {
    let (unit, mut sim) = unit_with_manual_rmi().await;

    let (flag, _) = tokio::join!(
        unit.get_sensor_ventmode_humidity_comfort(),
        answer(
            &mut sim,
            &[0x01, 0x1E, 0x01, 0x10, 0x06, 0x00],
            &[0x00, 0x01],
        ),
    );
    assert!(flag.unwrap());

    let (set, _) = tokio::join!(
        unit.set_sensor_ventmode_humidity_protection(false),
        answer(
            &mut sim,
            &[0x03, 0x1E, 0x01, 0x10, 0x07, 0x00, 0x00],
            &[0x00],
        ),
    );
    set.unwrap();
}

#[tokio::test]
async fn test_string_property_read() {
    let (unit, mut sim) = unit_with_manual_rmi().await;

    let mut response = vec![0x00];
    response.extend_from_slice(b"SN1234567890\0");
    let (value, _) = tokio::join!(unit.get_property(&PROPERTY_SERIAL_NUMBER), async {
        answer(
            &mut sim,
            &[0x01, 0x01, 0x01, 0x10, 0x04, 0x00],
            &response,
        )
        .await;
    });
    assert_eq!(
        value.unwrap(),
        PropertyValue::CString("SN1234567890".to_owned())
    );
}
