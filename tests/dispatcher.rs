mod common;

use common::{memory_channel, next, record, settle};
use rover_teleop::{
    command::{
        dispatcher::{CommandDispatcher, ControlState, PressPolicy},
        Direction, DirectionCommand,
    },
    config::ControllerConfig,
    TeleopError,
};
use serde_json::{json, Value};

const COMMAND: &str = "controller/currentCommand";
const STEERING: &str = "controller/steeringAngle";

fn command(value: Value) -> DirectionCommand {
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn press_then_release_sends_direction_then_stop() {
    let (channel, store) = memory_channel();
    let mut sent = record(&store, COMMAND).await;
    let mut pad = CommandDispatcher::new(channel, &ControllerConfig::default()).unwrap();

    for control in Direction::ALL.into_iter().filter(|d| *d != Direction::Stop) {
        pad.press_in(control).await.unwrap();
        assert_eq!(pad.state().press.get(control), ControlState::Pressed);
        pad.press_out(control).await.unwrap();
        assert_eq!(pad.state().press.get(control), ControlState::Idle);

        let first = command(next(&mut sent).await);
        let second = command(next(&mut sent).await);
        assert_eq!(first.direction, control);
        assert_eq!(second.direction, Direction::Stop);
        assert_eq!(first.speed, 120);
        assert_eq!(second.speed, 120);
    }
    assert!(sent.try_recv().is_err());
}

#[tokio::test]
async fn releasing_stop_sends_nothing() {
    let (channel, store) = memory_channel();
    let mut sent = record(&store, COMMAND).await;
    let mut pad = CommandDispatcher::new(channel, &ControllerConfig::default()).unwrap();

    let pressed = pad.press_in(Direction::Stop).await.unwrap();
    assert_eq!(pressed.direction, Direction::Stop);
    assert_eq!(pad.press_out(Direction::Stop).await.unwrap(), None);

    assert_eq!(command(next(&mut sent).await).direction, Direction::Stop);
    assert!(sent.try_recv().is_err());
    assert_eq!(pad.state().press.stop, ControlState::Idle);
}

#[tokio::test]
async fn wire_format_uses_short_tags() {
    let (channel, store) = memory_channel();
    let mut pad = CommandDispatcher::new(channel, &ControllerConfig::default()).unwrap();
    pad.press_in(Direction::BackwardRight).await.unwrap();

    let stored = store.get(COMMAND).await.unwrap();
    assert_eq!(stored["direction"], json!("BR"));
    assert_eq!(stored["speed"], json!(120));
    assert!(stored["timestamp"].as_str().is_some());
}

#[tokio::test]
async fn speed_changes_apply_to_the_next_command_only() {
    let (channel, store) = memory_channel();
    let mut sent = record(&store, COMMAND).await;
    let mut pad = CommandDispatcher::new(channel, &ControllerConfig::default()).unwrap();

    pad.press_in(Direction::Forward).await.unwrap();
    // Equidistant from 80 and 120, the lower level wins.
    assert_eq!(pad.set_speed(100.0), 80);
    settle().await;
    assert_eq!(command(next(&mut sent).await).speed, 120);
    assert!(sent.try_recv().is_err());

    pad.press_out(Direction::Forward).await.unwrap();
    assert_eq!(command(next(&mut sent).await).speed, 80);

    assert_eq!(pad.set_speed(254.0), 255);
    let cmd = pad.press_in(Direction::Left).await.unwrap();
    assert_eq!(cmd.speed, 255);
}

#[tokio::test]
async fn steering_is_snapped_and_published_immediately() {
    let (channel, store) = memory_channel();
    let mut angles = record(&store, STEERING).await;
    let mut commands = record(&store, COMMAND).await;
    let mut pad = CommandDispatcher::new(channel, &ControllerConfig::default()).unwrap();

    assert_eq!(pad.set_steering(47.0).await.unwrap(), 40);
    assert_eq!(pad.set_steering(500.0).await.unwrap(), 180);
    assert_eq!(next(&mut angles).await, json!(40));
    assert_eq!(next(&mut angles).await, json!(180));
    assert_eq!(pad.steering(), 180);
    assert!(commands.try_recv().is_err());
}

#[tokio::test]
async fn simultaneous_presses_are_independent() {
    let (channel, store) = memory_channel();
    let mut sent = record(&store, COMMAND).await;
    let mut pad = CommandDispatcher::new(channel, &ControllerConfig::default()).unwrap();

    pad.press_in(Direction::Forward).await.unwrap();
    pad.press_in(Direction::Left).await.unwrap();
    assert_eq!(pad.state().press.pressed(), vec![Direction::Forward, Direction::Left]);

    pad.press_out(Direction::Forward).await.unwrap();
    pad.press_out(Direction::Left).await.unwrap();

    let directions: Vec<Direction> = [
        next(&mut sent).await,
        next(&mut sent).await,
        next(&mut sent).await,
        next(&mut sent).await,
    ]
    .into_iter()
    .map(|v| command(v).direction)
    .collect();
    assert_eq!(
        directions,
        vec![Direction::Forward, Direction::Left, Direction::Stop, Direction::Stop]
    );
}

#[tokio::test]
async fn exclusive_policy_supersedes_held_controls() {
    let (channel, store) = memory_channel();
    let mut sent = record(&store, COMMAND).await;
    let config = ControllerConfig {
        press_policy: PressPolicy::Exclusive,
        ..Default::default()
    };
    let mut pad = CommandDispatcher::new(channel, &config).unwrap();

    pad.press_in(Direction::Forward).await.unwrap();
    pad.press_in(Direction::Right).await.unwrap();
    assert_eq!(pad.state().press.pressed(), vec![Direction::Right]);

    assert_eq!(pad.press_out(Direction::Forward).await.unwrap(), None);
    assert!(pad.press_out(Direction::Right).await.unwrap().is_some());

    let directions: Vec<Direction> = [next(&mut sent).await, next(&mut sent).await, next(&mut sent).await]
        .into_iter()
        .map(|v| command(v).direction)
        .collect();
    assert_eq!(directions, vec![Direction::Forward, Direction::Right, Direction::Stop]);
    assert!(sent.try_recv().is_err());
}

#[tokio::test]
async fn publish_failures_do_not_block_gestures() {
    let (channel, store) = memory_channel();
    let mut pad = CommandDispatcher::new(channel, &ControllerConfig::default()).unwrap();

    store.set_offline(true);
    assert!(matches!(
        pad.press_in(Direction::Forward).await,
        Err(TeleopError::ChannelUnavailable(_))
    ));
    assert_eq!(pad.state().press.forward, ControlState::Pressed);
    assert!(pad.set_steering(60.0).await.is_err());
    assert_eq!(pad.steering(), 60);

    store.set_offline(false);
    let stop = pad.press_out(Direction::Forward).await.unwrap().unwrap();
    assert_eq!(stop.direction, Direction::Stop);
    assert_eq!(store.get(COMMAND).await.unwrap()["direction"], json!("STOP"));
}

#[tokio::test]
async fn initial_values_are_snapped() {
    let (channel, _store) = memory_channel();
    let config = ControllerConfig {
        initial_speed: 130,
        initial_steering: 95,
        ..Default::default()
    };
    let pad = CommandDispatcher::new(channel, &config).unwrap();
    assert_eq!(pad.speed(), 120);
    assert_eq!(pad.steering(), 100);
}
