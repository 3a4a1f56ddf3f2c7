//! Application glue of the Modbus bridge device.
//!
//! [`Device`] owns the stack handle, the command dispatcher, the scheduler and
//! the board peripherals. The firmware main loop feeds it stack events
//! ([`Device::on_zcl_command`], [`Device::on_send_complete`],
//! [`Device::on_signal`], ...) and calls [`Device::run_one_pending_task`]
//! whenever it is idle.

#![allow(missing_docs)]
#![deny(unsafe_code)]

pub mod attrs;

pub use attrs::DeviceAttributes;

use crate::error::Error;
use crate::gpio::{
    BUTTON_SCAN_INTERVAL_MS, ButtonScanner, Buttons, HALL_IN_MSK, LED_BLUE, LED_GREEN, LED_RED,
    Leds,
};
use crate::modbus::{
    Baudrate, CommandHandler, Dispatcher, DrainOutcome, QueueTask, RecordState, SlotId,
};
use crate::scheduler::{Millis, Schedule, Scheduler};
use crate::zcl::{IncomingCommand, SendStatus, SendToken, ZclStack};

/// Endpoint carrying the basic and identify clusters.
pub const TEST_EP_ENDPOINT: u8 = 1;
/// Endpoint carrying the Modbus cluster.
pub const MODBUS_CLUSTER_ENDPOINT: u8 = 2;
/// Half period of the identify blink.
pub const IDENTIFY_BLINK_INTERVAL_MS: u32 = 100;

/// Callback capacity of the device scheduler.
pub const CALLBACK_CAPACITY: usize = 8;
/// Alarm capacity of the device scheduler. Covers one send timeout per slot
/// plus the blink and scan alarms.
pub const ALARM_CAPACITY: usize = 16;

/// Scheduler driving a [`Device`].
pub type DeviceScheduler = Scheduler<Task, CALLBACK_CAPACITY, ALARM_CAPACITY>;

/// Per-device settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceConfig {
    pub test_endpoint: u8,
    pub modbus_endpoint: u8,
    /// Shows whether the device is part of a network.
    pub network_led: u8,
    pub identify_led: u8,
    /// Blinks while an image is downloaded.
    pub ota_led: u8,
    /// Lit while the hall sensor is active.
    pub hall_led: u8,
    /// Input mask of the button that starts identify mode.
    pub identify_button: u32,
    /// Initial baudrate attribute value.
    pub baudrate: Baudrate,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            test_endpoint: TEST_EP_ENDPOINT,
            modbus_endpoint: MODBUS_CLUSTER_ENDPOINT,
            network_led: LED_BLUE,
            identify_led: LED_GREEN,
            ota_led: LED_RED,
            hall_led: LED_RED,
            identify_button: HALL_IN_MSK,
            baudrate: Baudrate::default(),
        }
    }
}

/// Every unit of work the device schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Task {
    Modbus(QueueTask),
    ToggleIdentifyLed,
    StartIdentifying,
    ScanButtons,
}

impl From<QueueTask> for Task {
    fn from(task: QueueTask) -> Self {
        Task::Modbus(task)
    }
}

/// Why finding & binding could not be started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IdentifyError {
    /// The stack is busy with another commissioning step.
    InvalidState,
    Other,
}

/// Stack and board services outside the cluster logic.
pub trait Platform {
    /// Whether the device has joined a network.
    fn is_joined(&self) -> bool;

    /// Start finding & binding as target on `endpoint`.
    fn start_finding_binding(&mut self, endpoint: u8) -> Result<(), IdentifyError>;

    fn cancel_finding_binding(&mut self);

    /// Whether the last long press of the reset button triggered a factory
    /// reset.
    fn factory_reset_done(&self) -> bool;

    /// Mark the running firmware image as good.
    fn confirm_image(&mut self);

    fn reboot(&mut self);
}

/// Application signals raised by the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Signal {
    DeviceReboot { ok: bool },
    Steering { ok: bool },
    Leave,
    Other(u16),
}

/// Firmware update progress reported by the OTA client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FotaEvent {
    /// Download progress in percent.
    Progress(u8),
    Finished,
    Error,
}

/// The Modbus bridge device.
#[derive(Debug)]
pub struct Device<Z, H, L, B, P> {
    stack: Z,
    dispatcher: Dispatcher<H>,
    sched: DeviceScheduler,
    scanner: ButtonScanner,
    leds: L,
    buttons: B,
    platform: P,
    config: DeviceConfig,
    attrs: DeviceAttributes,
    network_led_state: bool,
    blink_status: u32,
    identifying: bool,
    last_drain: Option<DrainOutcome>,
}

impl<Z, H, L, B, P> Device<Z, H, L, B, P>
where
    Z: ZclStack,
    H: CommandHandler,
    L: Leds,
    B: Buttons,
    P: Platform,
{
    pub fn new(
        stack: Z,
        handler: H,
        leds: L,
        buttons: B,
        platform: P,
        config: DeviceConfig,
    ) -> Result<Self, Error> {
        Ok(Self {
            stack,
            dispatcher: Dispatcher::new(handler),
            sched: DeviceScheduler::new(),
            scanner: ButtonScanner::new(),
            leds,
            buttons,
            platform,
            attrs: DeviceAttributes::new(&config)?,
            config,
            network_led_state: false,
            blink_status: 0,
            identifying: false,
            last_drain: None,
        })
    }

    /// Confirm the running image and start polling the buttons.
    pub fn start(&mut self) -> Result<(), Error> {
        self.platform.confirm_image();
        self.sched.schedule_alarm(Task::ScanButtons, BUTTON_SCAN_INTERVAL_MS)?;
        info!("device started");
        Ok(())
    }

    /// Command callback of the stack for the Modbus cluster.
    ///
    /// `Err(NotForCluster)` tells the stack to offer the command elsewhere.
    pub fn on_zcl_command(&mut self, cmd: &IncomingCommand<'_>) -> Result<SlotId, Error> {
        self.dispatcher.enqueue(cmd, &self.attrs, &mut self.sched)
    }

    /// Completion callback of [`ZclStack::send_command`].
    pub fn on_send_complete(&mut self, token: SendToken, status: SendStatus) -> bool {
        self.dispatcher.on_send_complete(token, status, &mut self.sched)
    }

    /// Run the next due task, if any.
    pub fn run_one_pending_task(&mut self, now: Millis) -> Option<Task> {
        let task = self.sched.run_one_pending_task(now)?;
        match task {
            Task::Modbus(QueueTask::Drain) => {
                let outcome = self.dispatcher.drain_one(&mut self.stack, &mut self.sched);
                self.last_drain = Some(outcome);
            }
            Task::Modbus(QueueTask::SendTimeout(token)) => {
                self.dispatcher.on_send_timeout(token, &mut self.sched);
            }
            Task::ToggleIdentifyLed => self.toggle_identify_led(),
            Task::StartIdentifying => self.start_identifying(),
            Task::ScanButtons => self.scan_buttons(),
        }
        Some(task)
    }

    /// Identify notification of the stack for our endpoints.
    pub fn on_identify(&mut self, active: bool) -> Result<(), Error> {
        self.sched.cancel_alarm(Task::ToggleIdentifyLed);
        if active {
            info!("enter identify mode");
            self.identifying = true;
            self.sched.schedule_callback(Task::ToggleIdentifyLed)
        } else {
            info!("cancel identify mode, network led {}", self.network_led_state);
            self.identifying = false;
            self.leds.set_led_off(self.config.identify_led);
            self.restore_network_led();
            Ok(())
        }
    }

    /// Application signal handler.
    pub fn on_signal(&mut self, signal: Signal) {
        match signal {
            Signal::DeviceReboot { ok } | Signal::Steering { ok } => self.network_led_state = ok,
            Signal::Leave => self.network_led_state = false,
            Signal::Other(id) => {
                trace!("signal {} ignored", id);
                return;
            }
        }
        if !self.identifying {
            self.restore_network_led();
        }
    }

    pub fn on_fota_event(&mut self, event: FotaEvent) {
        match event {
            FotaEvent::Progress(progress) => {
                self.leds.set_led(self.config.ota_led, u32::from(progress % 2));
            }
            FotaEvent::Finished => {
                info!("image downloaded, rebooting");
                self.platform.reboot();
            }
            FotaEvent::Error => error!("ota image transfer failed"),
        }
    }

    /// Validated write of a Modbus cluster attribute.
    pub fn write_attribute(&mut self, attr_id: u16, value: &[u8]) -> Result<(), Error> {
        self.attrs.write_modbus_attribute(attr_id, value)
    }

    /// Identify time attribute, as maintained by the identify cluster.
    pub fn set_identify_time(&mut self, seconds: u16) {
        self.attrs.identify_time = seconds;
    }

    pub fn stack(&self) -> &Z {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut Z {
        &mut self.stack
    }

    pub fn leds(&self) -> &L {
        &self.leds
    }

    pub fn buttons_mut(&mut self) -> &mut B {
        &mut self.buttons
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn dispatcher(&self) -> &Dispatcher<H> {
        &self.dispatcher
    }

    pub fn scheduler(&self) -> &DeviceScheduler {
        &self.sched
    }

    pub fn attributes(&self) -> &DeviceAttributes {
        &self.attrs
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn network_led_state(&self) -> bool {
        self.network_led_state
    }

    pub fn is_identifying(&self) -> bool {
        self.identifying
    }

    /// Outcome of the most recent drain turn.
    pub fn last_drain(&self) -> Option<DrainOutcome> {
        self.last_drain
    }

    /// State of the record held in `slot`.
    pub fn record_state(&self, slot: SlotId) -> Option<RecordState> {
        self.dispatcher.record_state(slot)
    }

    fn restore_network_led(&mut self) {
        self.leds
            .set_led(self.config.network_led, u32::from(self.network_led_state));
    }

    fn toggle_identify_led(&mut self) {
        // A callback queued before the cancel may still run.
        if !self.identifying {
            return;
        }
        self.blink_status = self.blink_status.wrapping_add(1);
        if self.blink_status % 2 == 1 {
            self.leds.set_led_off(self.config.network_led);
            self.leds.set_led_on(self.config.identify_led);
        } else {
            self.leds.set_led_off(self.config.identify_led);
            self.restore_network_led();
        }
        if let Err(e) = self
            .sched
            .schedule_alarm(Task::ToggleIdentifyLed, IDENTIFY_BLINK_INTERVAL_MS)
        {
            error!("cannot re-arm identify blink: {:?}", e);
        }
    }

    fn start_identifying(&mut self) {
        if !self.platform.is_joined() {
            warn!("device not in a network, cannot enter identify mode");
            return;
        }
        if self.attrs.identify_time == attrs::IDENTIFY_TIME_DEFAULT {
            match self.platform.start_finding_binding(self.config.test_endpoint) {
                Ok(()) => info!("enter identify mode"),
                Err(IdentifyError::InvalidState) => {
                    warn!("invalid state, cannot enter identify mode")
                }
                Err(e) => error!("finding & binding failed: {:?}", e),
            }
        } else {
            info!("cancel identify mode");
            self.platform.cancel_finding_binding();
        }
    }

    fn scan_buttons(&mut self) {
        if let Some((state, has_changed)) = self.scanner.poll(&mut self.buttons) {
            self.button_changed(state, has_changed);
        }
        if let Err(e) = self
            .sched
            .schedule_alarm(Task::ScanButtons, BUTTON_SCAN_INTERVAL_MS)
        {
            error!("cannot re-arm button scan: {:?}", e);
        }
    }

    fn button_changed(&mut self, state: u32, has_changed: u32) {
        if state != 0 {
            self.leds.set_led_off(self.config.network_led);
            self.leds.set_led_on(self.config.hall_led);
            info!("hall sensor activated");
        } else {
            self.leds.set_led_off(self.config.hall_led);
            self.restore_network_led();
            info!("hall sensor deactivated");
        }

        let button = self.config.identify_button;
        if has_changed & button != 0 && state & button == 0 {
            if self.platform.factory_reset_done() {
                debug!("after factory reset, ignoring button release");
            } else if let Err(e) = self.sched.schedule_callback(Task::StartIdentifying) {
                error!("cannot schedule identify: {:?}", e);
            }
        }
    }
}
