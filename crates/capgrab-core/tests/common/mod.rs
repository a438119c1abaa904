#![allow(dead_code)]

use async_trait::async_trait;
use capgrab_cloud::{
    CloudError, ImageSource, InstanceAddress, InstanceState, LaunchPlan, LaunchRequest,
    LaunchedInstance, NetworkInterface, ProviderGateway, RetryBudget, ServiceError, ShapeSpec,
    SubnetSource,
};
use capgrab_core::{EngineSettings, FixedDelay, PollPolicy};
use capgrab_notify::{MessageHandle, Notifier};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::time::Duration;

/// Answer to one create call
#[derive(Debug, Clone)]
pub enum Reply {
    Success,
    Reject(u16, Option<&'static str>),
    Transient,
}

impl Reply {
    fn error(&self) -> Option<CloudError> {
        match self {
            Reply::Success => None,
            Reply::Reject(status, code) => Some(CloudError::Service(ServiceError::new(
                *status,
                *code,
                "rejected",
            ))),
            Reply::Transient => Some(CloudError::Service(ServiceError::new(
                500,
                Some("InternalError"),
                "Out of host capacity.",
            ))),
        }
    }
}

/// How created instances behave while booting
#[derive(Debug, Clone, Copy)]
pub enum Boot {
    Ready,
    /// Running, but no public address ever appears
    NoAddress,
    Terminated,
    /// Provisioning for this many state checks, then ready
    AfterChecks(u32),
}

pub struct ScriptedGateway {
    zones: Vec<String>,
    zones_fail: bool,
    script: Mutex<VecDeque<Reply>>,
    per_zone: HashMap<String, Reply>,
    default: Reply,
    boot: Boot,
    create_delay: HashMap<String, Duration>,
    state_checks: AtomicU32,
    prepare_calls: AtomicU32,
    created: Mutex<Vec<LaunchedInstance>>,
    calls: Mutex<Vec<(String, String)>>,
    terminated: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub fn new(zones: &[&str]) -> Self {
        Self {
            zones: zones.iter().map(|z| z.to_string()).collect(),
            zones_fail: false,
            script: Mutex::new(VecDeque::new()),
            per_zone: HashMap::new(),
            default: Reply::Success,
            boot: Boot::Ready,
            create_delay: HashMap::new(),
            state_checks: AtomicU32::new(0),
            prepare_calls: AtomicU32::new(0),
            created: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            terminated: Mutex::new(Vec::new()),
        }
    }

    /// Replies consumed in call order before any other rule applies
    pub fn with_script(self, replies: Vec<Reply>) -> Self {
        *self.script.lock().unwrap() = replies.into();
        self
    }

    pub fn with_zone_reply(mut self, zone: &str, reply: Reply) -> Self {
        self.per_zone.insert(zone.to_string(), reply);
        self
    }

    pub fn with_default(mut self, reply: Reply) -> Self {
        self.default = reply;
        self
    }

    pub fn with_boot(mut self, boot: Boot) -> Self {
        self.boot = boot;
        self
    }

    /// Delay create calls of plans using `image_id`
    pub fn with_create_delay(mut self, image_id: &str, delay: Duration) -> Self {
        self.create_delay.insert(image_id.to_string(), delay);
        self
    }

    pub fn with_failing_zone_listing(mut self) -> Self {
        self.zones_fail = true;
        self
    }

    /// Zones of every create call, in order
    pub fn zones_called(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(z, _)| z.clone()).collect()
    }

    /// Display names of every create call, in order
    pub fn names_called(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(_, n)| n.clone()).collect()
    }

    pub fn prepare_calls(&self) -> u32 {
        self.prepare_calls.load(Ordering::SeqCst)
    }

    pub fn terminated(&self) -> Vec<String> {
        self.terminated.lock().unwrap().clone()
    }

    fn next_reply(&self, zone: &str) -> Reply {
        if let Some(reply) = self.script.lock().unwrap().pop_front() {
            return reply;
        }
        self.per_zone
            .get(zone)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

#[async_trait]
impl ProviderGateway for ScriptedGateway {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn prepare_launch(&self, plan: &LaunchPlan) -> capgrab_cloud::Result<LaunchRequest> {
        self.prepare_calls.fetch_add(1, Ordering::SeqCst);
        if plan.shape.name.is_empty() {
            return Err(CloudError::InvalidConfig("shape is required".into()));
        }
        let image_id = match &plan.image {
            ImageSource::Id(id) => id.clone(),
            ImageSource::Lookup { .. } => "ocid1.image.looked-up".to_string(),
        };
        Ok(LaunchRequest {
            compartment_id: "ocid1.tenancy".into(),
            image_name: image_id.clone(),
            image_id,
            subnet_id: "ocid1.subnet".into(),
            shape: plan.shape.clone(),
            boot_volume_gb: plan.boot_volume_gb,
            boot_volume_display_gb: 50.0,
            ssh_authorized_key: plan.ssh_authorized_key.clone(),
            cloud_init: plan.cloud_init.clone(),
        })
    }

    async fn create_instance(
        &self,
        request: &LaunchRequest,
        zone: &str,
        display_name: &str,
    ) -> capgrab_cloud::Result<LaunchedInstance> {
        if let Some(delay) = self.create_delay.get(&request.image_id) {
            tokio::time::sleep(*delay).await;
        }

        self.calls
            .lock()
            .unwrap()
            .push((zone.to_string(), display_name.to_string()));

        if let Some(error) = self.next_reply(zone).error() {
            return Err(error);
        }

        let mut created = self.created.lock().unwrap();
        let instance = LaunchedInstance {
            id: format!("ocid1.instance.{}", created.len() + 1),
            display_name: display_name.to_string(),
            zone: zone.to_string(),
        };
        created.push(instance.clone());
        Ok(instance)
    }

    async fn list_availability_zones(&self) -> capgrab_cloud::Result<Vec<String>> {
        if self.zones_fail {
            return Err(CloudError::CommandFailed("NotAuthenticated".into()));
        }
        Ok(self.zones.clone())
    }

    async fn get_instance_state(&self, _instance_id: &str) -> capgrab_cloud::Result<InstanceState> {
        let checks = self.state_checks.fetch_add(1, Ordering::SeqCst);
        Ok(match self.boot {
            Boot::Terminated => InstanceState::Terminated,
            Boot::AfterChecks(n) if checks < n => InstanceState::Provisioning,
            _ => InstanceState::Running,
        })
    }

    async fn list_network_interfaces(
        &self,
        instance_id: &str,
    ) -> capgrab_cloud::Result<Vec<NetworkInterface>> {
        Ok(vec![NetworkInterface {
            id: format!("vnic-{}", instance_id),
        }])
    }

    async fn get_interface_public_address(
        &self,
        _interface_id: &str,
    ) -> capgrab_cloud::Result<Option<String>> {
        Ok(match self.boot {
            Boot::NoAddress => None,
            _ => Some("203.0.113.7".to_string()),
        })
    }

    async fn terminate_instance(&self, instance_id: &str) -> capgrab_cloud::Result<()> {
        self.terminated.lock().unwrap().push(instance_id.to_string());
        Ok(())
    }

    async fn list_public_addresses(&self) -> capgrab_cloud::Result<Vec<InstanceAddress>> {
        Ok(self
            .created
            .lock()
            .unwrap()
            .iter()
            .map(|i| InstanceAddress {
                instance_name: i.display_name.clone(),
                address: "203.0.113.7".to_string(),
            })
            .collect())
    }
}

/// Notifier that keeps every message
#[derive(Default)]
pub struct RecordingNotifier {
    next_id: AtomicI64,
    sent: Mutex<Vec<(String, String)>>,
    edits: Mutex<Vec<(i64, String)>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn edits(&self) -> Vec<(i64, String)> {
        self.edits.lock().unwrap().clone()
    }

    pub fn sent_containing(&self, needle: &str) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, text)| text.contains(needle))
            .count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, context: &str, text: &str) -> capgrab_notify::Result<MessageHandle> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.sent
            .lock()
            .unwrap()
            .push((context.to_string(), text.to_string()));
        Ok(MessageHandle::new(id))
    }

    async fn edit(
        &self,
        handle: &MessageHandle,
        _context: &str,
        text: &str,
    ) -> capgrab_notify::Result<()> {
        self.edits
            .lock()
            .unwrap()
            .push((handle.message_id.unwrap_or_default(), text.to_string()));
        Ok(())
    }
}

/// Round-robin plan for `sum` instances with no retry limit
pub fn plan(sum: u32) -> LaunchPlan {
    LaunchPlan {
        sum,
        shape: ShapeSpec {
            name: "VM.Standard.A1.Flex".to_string(),
            ocpus: Some(4.0),
            memory_gb: Some(24.0),
            burst: Default::default(),
        },
        boot_volume_gb: None,
        zone: None,
        each: 0,
        min_delay: Duration::from_secs(30),
        max_delay: Duration::from_secs(60),
        retry: RetryBudget::Unlimited,
        display_name: "arm".to_string(),
        cloud_init: None,
        ssh_authorized_key: "ssh-ed25519 AAAA test".to_string(),
        image: ImageSource::Id("ocid1.image.ubuntu".to_string()),
        subnet: SubnetSource::Id("ocid1.subnet".to_string()),
        terminate_unready: false,
    }
}

/// No delay between attempts; three quick readiness checks
pub fn settings() -> EngineSettings {
    EngineSettings::default()
        .with_delay(Arc::new(FixedDelay(Duration::ZERO)))
        .with_readiness(PollPolicy::new(3, Duration::from_secs(1)))
}

pub fn zones(names: &[&str]) -> Vec<String> {
    names.iter().map(|z| z.to_string()).collect()
}
