//! Command queue dispatcher.
//!
//! Admission happens synchronously inside the stack's command callback
//! ([`Dispatcher::enqueue`]); the actual work happens later, one record per
//! scheduler turn ([`Dispatcher::drain_one`]). At most one drain task is ever
//! pending: it is scheduled when the queue becomes non-empty and re-scheduled
//! by each drain that leaves work behind. If the scheduler refuses, the next
//! send completion or timeout schedules it again.

use super::handler::CommandHandler;
use super::pool::{SlotId, SlotPool};
use super::wire::{DataPacketResponse, JsonCommandRequest};
use super::{
    ATTR_BAUDRATE_ID, Baudrate, CLUSTER_ID, CMD_JSON_COMMAND_REQ_ID, CMD_JSON_COMMAND_RESP_ID,
    CommandLists, MAX_FIFO_SIZE, SEND_TIMEOUT_MS, command_lists,
};
use crate::error::Error;
use crate::scheduler::Schedule;
use crate::zcl::{
    AddrMode, AttributeStore, ClusterRole, FrameDirection, IncomingCommand, OutgoingFrame,
    SendStatus, SendToken, ZclStack,
};
use heapless::Deque;

/// Work items the dispatcher asks the scheduler to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QueueTask {
    /// Process the record at the head of the queue.
    Drain,
    /// Give up on an outstanding response transmission.
    SendTimeout(SendToken),
}

/// Lifecycle of a command record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecordState {
    /// Header copied from the incoming frame.
    #[default]
    Received,
    /// Waiting in the dispatch queue.
    Queued,
    /// Handed to the command handler.
    Processing,
    /// Response handed to the stack, completion not yet reported.
    AwaitingSend,
    /// Terminal; the slot is being released.
    Completed,
}

/// Addressing and correlation data of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandAddr {
    pub src_addr: u16,
    pub src_endpoint: u8,
    pub dst_endpoint: u8,
    pub cmd_id: u8,
    pub seq_number: u8,
    pub disable_default_response: bool,
    pub profile_id: u16,
}

/// One in-flight vendor command transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandRecord {
    pub addr: CommandAddr,
    pub request: JsonCommandRequest,
    pub resp: DataPacketResponse,
    pub state: RecordState,
    /// Identity of the completion the stack will report, once sent.
    pub pending: Option<SendToken>,
}

/// What a single drain turn did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DrainOutcome {
    /// The queue was empty.
    Idle,
    /// A response went to the stack; the slot is held until completion.
    Responded(SendToken),
    /// The command id is not one this cluster handles. The slot was
    /// released and other cluster handlers may claim the command.
    NotProcessed { cmd_id: u8 },
    /// The record was abandoned and its slot released.
    Dropped(Error),
}

impl DrainOutcome {
    /// Whether the cluster claimed the command.
    pub fn processed(&self) -> bool {
        !matches!(self, DrainOutcome::NotProcessed { .. } | DrainOutcome::Idle)
    }
}

/// Bounded FIFO of command records over an injected slot pool.
#[derive(Debug)]
pub struct Dispatcher<H, const N: usize = MAX_FIFO_SIZE> {
    pool: SlotPool<CommandRecord, N>,
    fifo: Deque<SlotId, N>,
    handler: H,
    role: ClusterRole,
    drain_scheduled: bool,
    generation: u16,
}

impl<H: CommandHandler, const N: usize> Dispatcher<H, N> {
    /// Dispatcher for the server side of the cluster with a fresh pool.
    pub fn new(handler: H) -> Self {
        Self::with_pool(ClusterRole::Server, SlotPool::new(), handler)
    }

    /// Dispatcher for the given role, taking ownership of `pool`.
    pub fn with_pool(role: ClusterRole, pool: SlotPool<CommandRecord, N>, handler: H) -> Self {
        Self {
            pool,
            fifo: Deque::new(),
            handler,
            role,
            drain_scheduled: false,
            generation: 0,
        }
    }

    pub fn role(&self) -> ClusterRole {
        self.role
    }

    /// Command lists this dispatcher reports for discovery.
    pub fn command_lists(&self) -> CommandLists {
        command_lists(self.role)
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn pool(&self) -> &SlotPool<CommandRecord, N> {
        &self.pool
    }

    /// Number of records waiting to be drained.
    pub fn len(&self) -> usize {
        self.fifo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fifo.is_empty()
    }

    /// Number of slots held, queued or awaiting send completion.
    pub fn in_use(&self) -> usize {
        self.pool.in_use_count()
    }

    /// Admit a command delivered by the stack.
    ///
    /// Nothing is queued and the pool is left untouched on any error.
    pub fn enqueue<A, S>(
        &mut self,
        cmd: &IncomingCommand<'_>,
        attrs: &A,
        sched: &mut S,
    ) -> Result<SlotId, Error>
    where
        A: AttributeStore + ?Sized,
        S: Schedule<QueueTask> + ?Sized,
    {
        let hdr = &cmd.header;
        if hdr.cluster_id != CLUSTER_ID || hdr.direction != FrameDirection::ToServer {
            return Err(Error::NotForCluster);
        }

        trace!("modbus command {} seq {}", hdr.cmd_id, hdr.seq_number);
        // Diagnostic only, the value does not affect admission.
        let baudrate = attrs
            .read_attribute(hdr.dst_endpoint, CLUSTER_ID, ClusterRole::Server, ATTR_BAUDRATE_ID)
            .and_then(|v| Baudrate::try_from(v).ok());
        if let Some(baudrate) = baudrate {
            trace!("baudrate is {}", baudrate.bps());
        }

        if self.fifo.is_full() {
            warn!("command queue full, dropping seq {}", hdr.seq_number);
            return Err(Error::QueueFull);
        }

        let request = if hdr.cmd_id == CMD_JSON_COMMAND_REQ_ID {
            JsonCommandRequest::parse(cmd.payload).inspect_err(|_| {
                warn!("malformed json command seq {}", hdr.seq_number);
            })?
        } else {
            JsonCommandRequest::default()
        };

        let slot = self.pool.allocate().inspect_err(|_| {
            warn!("slot pool exhausted, dropping seq {}", hdr.seq_number);
        })?;

        if let Some(record) = self.pool.get_mut(slot) {
            record.addr = CommandAddr {
                src_addr: hdr.src_addr,
                src_endpoint: hdr.src_endpoint,
                dst_endpoint: hdr.dst_endpoint,
                cmd_id: hdr.cmd_id,
                seq_number: hdr.seq_number,
                disable_default_response: hdr.disable_default_response,
                profile_id: hdr.profile_id,
            };
            record.request = request;
            record.state = RecordState::Received;
        }

        if self.fifo.push_back(slot).is_err() {
            self.pool.free(slot);
            return Err(Error::QueueFull);
        }

        if !self.drain_scheduled {
            if let Err(e) = self.schedule_drain(sched) {
                self.fifo.pop_back();
                self.pool.free(slot);
                return Err(e);
            }
        }

        if let Some(record) = self.pool.get_mut(slot) {
            record.state = RecordState::Queued;
        }
        debug!("queued command {} in slot {}", hdr.cmd_id, slot.raw());
        Ok(slot)
    }

    /// Process the record at the head of the queue.
    pub fn drain_one<Z, S>(&mut self, stack: &mut Z, sched: &mut S) -> DrainOutcome
    where
        Z: ZclStack + ?Sized,
        S: Schedule<QueueTask> + ?Sized,
    {
        self.drain_scheduled = false;

        let outcome = match self.fifo.pop_front() {
            Some(slot) => self.process(slot, stack, sched),
            None => DrainOutcome::Idle,
        };

        self.resume_drain(sched);
        outcome
    }

    /// Schedule the drain task, as a callback or failing that as an alarm
    /// due immediately.
    fn schedule_drain<S>(&mut self, sched: &mut S) -> Result<(), Error>
    where
        S: Schedule<QueueTask> + ?Sized,
    {
        sched
            .schedule_callback(QueueTask::Drain)
            .or_else(|_| sched.schedule_alarm(QueueTask::Drain, 0))?;
        self.drain_scheduled = true;
        Ok(())
    }

    /// Make sure a drain is pending while records are queued.
    ///
    /// Called after every drain and on every send completion or timeout, so a
    /// scheduler that was full once cannot strand the queue.
    fn resume_drain<S>(&mut self, sched: &mut S)
    where
        S: Schedule<QueueTask> + ?Sized,
    {
        if self.drain_scheduled || self.fifo.is_empty() {
            return;
        }
        if self.schedule_drain(sched).is_err() {
            error!("cannot reschedule drain, {} left", self.fifo.len());
        }
    }

    fn process<Z, S>(&mut self, slot: SlotId, stack: &mut Z, sched: &mut S) -> DrainOutcome
    where
        Z: ZclStack + ?Sized,
        S: Schedule<QueueTask> + ?Sized,
    {
        let Some(record) = self.pool.get_mut(slot) else {
            return DrainOutcome::Dropped(Error::UnknownCommand);
        };
        record.state = RecordState::Processing;
        let addr = record.addr;

        if addr.cmd_id != CMD_JSON_COMMAND_REQ_ID {
            debug!("command {} not processed", addr.cmd_id);
            record.state = RecordState::Completed;
            self.pool.free(slot);
            return DrainOutcome::NotProcessed { cmd_id: addr.cmd_id };
        }

        let status = self
            .handler
            .handle_json_command(&addr, &record.request, &mut record.resp);
        record.resp.err = status.to_err();

        self.generation = self.generation.wrapping_add(1);
        let token = SendToken {
            slot: slot.raw(),
            generation: self.generation,
        };
        let payload = record.resp.to_frame();
        let frame = OutgoingFrame {
            dst_addr: addr.src_addr,
            dst_addr_mode: AddrMode::Short,
            dst_endpoint: addr.src_endpoint,
            src_endpoint: addr.dst_endpoint,
            profile_id: addr.profile_id,
            cluster_id: CLUSTER_ID,
            cmd_id: CMD_JSON_COMMAND_RESP_ID,
            seq_number: addr.seq_number,
            direction: FrameDirection::ToClient,
            disable_default_response: true,
            payload: &payload,
            token,
        };

        if let Err(e) = stack.send_command(&frame) {
            error!("failed to send response seq {}: {:?}", addr.seq_number, e);
            record.state = RecordState::Completed;
            self.pool.free(slot);
            return DrainOutcome::Dropped(Error::SendFailed);
        }

        record.state = RecordState::AwaitingSend;
        record.pending = Some(token);
        if sched
            .schedule_alarm(QueueTask::SendTimeout(token), SEND_TIMEOUT_MS)
            .is_err()
        {
            // Without a timeout the slot could be held forever.
            warn!("no alarm for seq {}, releasing slot", addr.seq_number);
            record.state = RecordState::Completed;
            self.pool.free(slot);
            return DrainOutcome::Dropped(Error::SchedulerFull);
        }

        debug!("response for seq {} handed to stack", addr.seq_number);
        DrainOutcome::Responded(token)
    }

    /// Completion callback of the send primitive.
    ///
    /// Returns `false` for a token that no longer matches an outstanding
    /// transmission (e.g. one that already timed out).
    pub fn on_send_complete<S>(&mut self, token: SendToken, status: SendStatus, sched: &mut S) -> bool
    where
        S: Schedule<QueueTask> + ?Sized,
    {
        let Some(slot) = self.awaiting(token) else {
            debug!("stale send completion for slot {} generation {}", token.slot, token.generation);
            return false;
        };
        sched.cancel_alarm(QueueTask::SendTimeout(token));
        if status == SendStatus::Failed {
            warn!("response in slot {} was not delivered", token.slot);
        }
        self.complete(slot);
        self.resume_drain(sched);
        true
    }

    /// Timeout alarm of an outstanding transmission.
    ///
    /// Returns `true` if a transaction was abandoned.
    pub fn on_send_timeout<S>(&mut self, token: SendToken, sched: &mut S) -> bool
    where
        S: Schedule<QueueTask> + ?Sized,
    {
        let Some(slot) = self.awaiting(token) else {
            return false;
        };
        warn!("{:?}, releasing slot {}", Error::SendTimeout, token.slot);
        self.complete(slot);
        self.resume_drain(sched);
        true
    }

    /// State of the record held in `slot`, if allocated.
    pub fn record_state(&self, slot: SlotId) -> Option<RecordState> {
        self.pool.get(slot).map(|r| r.state)
    }

    /// Slots in drain order.
    pub fn queued(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.fifo.iter().copied()
    }

    /// Sequence numbers of queued records in drain order.
    pub fn queued_seq_numbers(&self) -> impl Iterator<Item = u8> + '_ {
        self.fifo
            .iter()
            .filter_map(|slot| self.pool.get(*slot).map(|r| r.addr.seq_number))
    }

    fn awaiting(&self, token: SendToken) -> Option<SlotId> {
        let slot = SlotId::from_raw(token.slot);
        let record = self.pool.get(slot)?;
        (record.state == RecordState::AwaitingSend && record.pending == Some(token)).then_some(slot)
    }

    fn complete(&mut self, slot: SlotId) {
        if let Some(record) = self.pool.get_mut(slot) {
            record.state = RecordState::Completed;
            record.pending = None;
        }
        self.pool.free(slot);
    }
}
