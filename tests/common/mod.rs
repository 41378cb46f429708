//! Scripted in-memory bridge shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use stremio_remote::device::{Bridge, BridgeError, DeviceEndpoint};

/// What the fake `adb` answers for a shell command
#[derive(Debug, Clone)]
pub enum Reply {
    Output(String),
    Lost(String),
    Timeout,
    Exited(String),
}

impl Reply {
    pub fn output(text: &str) -> Self {
        Reply::Output(text.to_string())
    }

    fn into_result(self) -> Result<String, BridgeError> {
        match self {
            Reply::Output(text) => Ok(text),
            Reply::Lost(msg) => Err(BridgeError::DeviceLost(msg)),
            Reply::Timeout => Err(BridgeError::Timeout(Duration::from_secs(10))),
            Reply::Exited(stderr) => Err(BridgeError::Exited {
                code: Some(1),
                stderr,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect(String),
    Devices,
    Shell(String),
    Disconnect(String),
}

#[derive(Default)]
struct Script {
    connect: VecDeque<Reply>,
    default_connect: Option<Reply>,
    devices: VecDeque<String>,
    default_devices: String,
    shell_rules: Vec<(String, Reply)>,
    calls: Vec<(Call, Instant)>,
    latency: Duration,
    missing: bool,
}

/// In-memory `Bridge` with scripted replies and a call log
///
/// Connects answer "connected to <serial>" unless scripted otherwise and the
/// device listing is empty (pending approval) until set.
#[derive(Default)]
pub struct FakeBridge {
    script: Mutex<Script>,
}

impl FakeBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bridge whose listing shows `endpoint` as an approved device
    pub fn authorized(endpoint: &DeviceEndpoint) -> Self {
        let bridge = Self::new();
        bridge.set_devices(&listing(&[(&endpoint.serial(), "device")]));
        bridge
    }

    pub fn set_devices(&self, listing: &str) {
        self.script.lock().unwrap().default_devices = listing.to_string();
    }

    /// One-shot listings consumed before the default
    pub fn push_devices(&self, listing: &str) {
        self.script.lock().unwrap().devices.push_back(listing.to_string());
    }

    pub fn set_connect(&self, reply: Reply) {
        self.script.lock().unwrap().default_connect = Some(reply);
    }

    pub fn push_connect(&self, reply: Reply) {
        self.script.lock().unwrap().connect.push_back(reply);
    }

    /// Every call takes `latency` to answer, as a slow link would
    pub fn set_latency(&self, latency: Duration) {
        self.script.lock().unwrap().latency = latency;
    }

    /// Report the transport as not installed
    pub fn set_missing(&self) {
        self.script.lock().unwrap().missing = true;
    }

    /// Answer shell commands containing `pattern`; first matching rule wins
    pub fn on_shell(&self, pattern: &str, reply: Reply) {
        self.script
            .lock()
            .unwrap()
            .shell_rules
            .push((pattern.to_string(), reply));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script
            .lock()
            .unwrap()
            .calls
            .iter()
            .map(|(call, _)| call.clone())
            .collect()
    }

    pub fn timed_calls(&self) -> Vec<(Call, Instant)> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn shell_commands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Shell(cmd) => Some(cmd),
                _ => None,
            })
            .collect()
    }

    pub fn connect_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Connect(_)))
            .count()
    }

    /// Log the call, then wait out the configured latency
    async fn record(&self, call: Call) {
        let latency = {
            let mut script = self.script.lock().unwrap();
            script.calls.push((call, Instant::now()));
            script.latency
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl Bridge for FakeBridge {
    async fn connect(&self, endpoint: &DeviceEndpoint) -> Result<String, BridgeError> {
        self.record(Call::Connect(endpoint.serial())).await;
        let reply = {
            let mut script = self.script.lock().unwrap();
            script
                .connect
                .pop_front()
                .or_else(|| script.default_connect.clone())
        };
        reply
            .unwrap_or_else(|| Reply::Output(format!("connected to {}\n", endpoint.serial())))
            .into_result()
    }

    async fn devices(&self) -> Result<String, BridgeError> {
        self.record(Call::Devices).await;
        let mut script = self.script.lock().unwrap();
        let listing = script
            .devices
            .pop_front()
            .unwrap_or_else(|| script.default_devices.clone());
        Ok(format!("List of devices attached\n{}", listing))
    }

    async fn shell(&self, _endpoint: &DeviceEndpoint, command: &str) -> Result<String, BridgeError> {
        self.record(Call::Shell(command.to_string())).await;
        let reply = {
            let script = self.script.lock().unwrap();
            script
                .shell_rules
                .iter()
                .find(|(pattern, _)| command.contains(pattern.as_str()))
                .map(|(_, reply)| reply.clone())
        };
        reply.unwrap_or(Reply::Output(String::new())).into_result()
    }

    async fn disconnect(&self, endpoint: &DeviceEndpoint) -> Result<(), BridgeError> {
        self.record(Call::Disconnect(endpoint.serial())).await;
        Ok(())
    }

    async fn is_available(&self) -> bool {
        !self.script.lock().unwrap().missing
    }

    fn location(&self) -> String {
        "fake-adb".to_string()
    }
}

/// `adb devices` body from `(serial, status)` pairs
pub fn listing(entries: &[(&str, &str)]) -> String {
    entries
        .iter()
        .map(|(serial, status)| format!("{}\t{}\n", serial, status))
        .collect()
}
