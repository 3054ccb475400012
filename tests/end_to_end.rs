//! Config text → dispatcher → executor, driven through the message channel

use midi2cmd::{CommandExecutor, Config, Dispatcher, MidiMessage, VALUE_VAR};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<(String, String)>>,
}

impl CommandExecutor for Recorder {
    fn execute(&self, command: &str, env: &HashMap<String, String>) {
        self.calls
            .lock()
            .push((command.to_string(), env[VALUE_VAR].clone()));
    }
}

const CONFIG: &str = "
port: miditest
accumulate_window: 0.1

pitchwheel channel=10: echo PITCHWHEEL:$MIDI_VALUE
control_change channel=10 control=9: echo CC_CONTROL_9:$MIDI_VALUE
control_change channel=10 control=18: echo CC_CONTROL_18:$MIDI_VALUE
control_change channel=10 control=26: echo CC_CONTROL_26:$MIDI_VALUE
control_change channel=10 control=1: echo CC_CONTROL_1:$MIDI_VALUE
";

fn raw_sequence() -> Vec<Vec<u8>> {
    vec![
        vec![0xEA, 0x00, 0x40], // pitchwheel ch10 centre
        vec![0xBA, 9, 64],
        vec![0xBA, 18, 0],
        vec![0xBA, 26, 127],
        vec![0xBA, 1, 1],
        vec![0x9A, 60, 100], // note_on, not routed
        vec![0xB6, 9, 64],   // channel 6, not bound
    ]
}

#[tokio::test(start_paused = true)]
async fn test_sequence_runs_each_bound_command_once() {
    let config = Config::parse(CONFIG).unwrap();
    assert_eq!(config.port.as_deref(), Some("miditest"));

    let recorder = Arc::new(Recorder::default());
    let dispatcher = Dispatcher::from_config(&config, recorder.clone());

    let (tx, rx) = mpsc::channel(16);
    let reader = tokio::spawn({
        let dispatcher = dispatcher.clone();
        async move { dispatcher.run(rx, std::future::pending()).await }
    });

    for raw in raw_sequence() {
        let message = MidiMessage::parse(&raw).unwrap();
        tx.send(message).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    drop(tx);
    assert_eq!(reader.await.unwrap(), 7);

    let calls = recorder.calls.lock().clone();
    assert_eq!(
        calls,
        vec![
            ("echo PITCHWHEEL:$MIDI_VALUE".to_string(), "0".to_string()),
            ("echo CC_CONTROL_9:$MIDI_VALUE".to_string(), "64".to_string()),
            ("echo CC_CONTROL_18:$MIDI_VALUE".to_string(), "0".to_string()),
            ("echo CC_CONTROL_26:$MIDI_VALUE".to_string(), "127".to_string()),
            ("echo CC_CONTROL_1:$MIDI_VALUE".to_string(), "1".to_string()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_single_event_scenario() {
    let config = Config::parse("control_change channel=10 control=9: echo $MIDI_VALUE\n").unwrap();
    let recorder = Arc::new(Recorder::default());
    let dispatcher = Dispatcher::from_config(&config, recorder.clone());

    dispatcher.handle(&MidiMessage::control_change(10, 9, 64));
    dispatcher.handle(&MidiMessage::control_change(3, 3, 64));
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(
        *recorder.calls.lock(),
        vec![("echo $MIDI_VALUE".to_string(), "64".to_string())]
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_shell_commands_see_the_value() {
    use midi2cmd::ShellExecutor;
    use tempfile::TempDir;

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("value.txt");
    let config = Config::parse(&format!(
        "accumulate_window: 0.05\ncontrol_change channel=10 control=9: echo \"$MIDI_VALUE\" >> '{}'\n",
        out.display()
    ))
    .unwrap();
    let dispatcher = Dispatcher::from_config(&config, Arc::new(ShellExecutor::new()));

    for value in [10, 40, 64] {
        dispatcher.handle(&MidiMessage::control_change(10, 9, value));
    }

    let mut contents = String::new();
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if let Ok(text) = std::fs::read_to_string(&out) {
            if text.ends_with('\n') {
                contents = text;
                break;
            }
        }
    }
    assert_eq!(contents, "64\n");
}
