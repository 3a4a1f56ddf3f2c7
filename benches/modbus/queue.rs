use criterion::{Criterion, Throughput};
use std::hint::black_box;
use zb_modbus::error::Error;
use zb_modbus::modbus::{
    self, CommandAddr, CommandHandler, DataPacketResponse, Dispatcher, DrainOutcome,
    JsonCommandRequest, MAX_FIFO_SIZE, QueueTask, ResponseStatus,
};
use zb_modbus::scheduler::Scheduler;
use zb_modbus::zcl::{
    AttrValue, AttributeStore, ClusterRole, IncomingCommand, OutgoingFrame, ParsedHeader,
    SendStatus, ZclStack,
};

struct Echo;

impl CommandHandler for Echo {
    fn handle_json_command(
        &mut self,
        _addr: &CommandAddr,
        request: &JsonCommandRequest,
        resp: &mut DataPacketResponse,
    ) -> ResponseStatus {
        resp.fc = request.len();
        ResponseStatus::Ok
    }
}

struct Sink {
    bytes: usize,
}

impl ZclStack for Sink {
    fn send_command(&mut self, frame: &OutgoingFrame<'_>) -> Result<(), Error> {
        self.bytes += frame.payload.len();
        Ok(())
    }
}

struct Attrs;

impl AttributeStore for Attrs {
    fn read_attribute(&self, _: u8, _: u16, _: ClusterRole, attr_id: u16) -> Option<AttrValue> {
        (attr_id == modbus::ATTR_BAUDRATE_ID).then_some(AttrValue::Enum8(1))
    }
}

type Sched = Scheduler<QueueTask, 4, 16>;

const BODY: &[u8] = br#"{"fc":3,"id":1,"addr":100,"n":10}"#;

fn payload() -> Vec<u8> {
    let mut payload = vec![BODY.len() as u8];
    payload.extend_from_slice(BODY);
    payload
}

fn header(seq_number: u8) -> ParsedHeader {
    ParsedHeader {
        cluster_id: modbus::CLUSTER_ID,
        cmd_id: modbus::CMD_JSON_COMMAND_REQ_ID,
        seq_number,
        src_addr: 0x1234,
        src_endpoint: 1,
        dst_endpoint: 2,
        ..ParsedHeader::default()
    }
}

/// Admit, drain and complete one command.
fn cycle(d: &mut Dispatcher<Echo>, sched: &mut Sched, stack: &mut Sink, payload: &[u8], seq: u8) {
    let cmd = IncomingCommand::new(header(seq), payload);
    d.enqueue(&cmd, &Attrs, sched).expect("enqueue");
    let _ = sched.run_one_pending_task(0);
    if let DrainOutcome::Responded(token) = d.drain_one(stack, sched) {
        d.on_send_complete(token, SendStatus::Delivered, sched);
    }
}

pub fn bench_enqueue_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("enqueue_drain");
    let payload = payload();
    group.throughput(Throughput::Bytes(payload.len() as u64));

    let mut d: Dispatcher<Echo> = Dispatcher::new(Echo);
    let mut sched = Sched::new();
    let mut stack = Sink { bytes: 0 };
    let mut seq = 0u8;

    group.bench_function("single", |b| {
        b.iter(|| {
            seq = seq.wrapping_add(1);
            cycle(&mut d, &mut sched, &mut stack, black_box(&payload), seq);
        })
    });
    group.finish();
}

pub fn bench_fill_and_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill_and_drain");
    let payload = payload();
    group.throughput(Throughput::Elements(MAX_FIFO_SIZE as u64));

    group.bench_function("full_queue", |b| {
        b.iter_batched_ref(
            || (Dispatcher::<Echo>::new(Echo), Sched::new(), Sink { bytes: 0 }),
            |(d, sched, stack)| {
                for seq in 0..MAX_FIFO_SIZE as u8 {
                    let cmd = IncomingCommand::new(header(seq), &payload);
                    d.enqueue(&cmd, &Attrs, sched).expect("enqueue");
                }
                while let Some(task) = sched.run_one_pending_task(0) {
                    if task == QueueTask::Drain {
                        if let DrainOutcome::Responded(token) = d.drain_one(stack, sched) {
                            d.on_send_complete(token, SendStatus::Delivered, sched);
                        }
                    }
                }
            },
            criterion::BatchSize::SmallInput,
        )
    });
    group.finish();
}

pub fn bench_response_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("response_encode");
    let mut resp = DataPacketResponse {
        fc: 3,
        slave_id: 1,
        addr: 100,
        ..DataPacketResponse::default()
    };
    for i in 0..modbus::MAX_NUM_REGISTERS as u16 {
        resp.registers.push(i).expect("register capacity");
    }
    group.throughput(Throughput::Bytes(resp.encoded_len() as u64));

    group.bench_function("max_registers", |b| {
        b.iter(|| black_box(&resp).to_frame())
    });
    group.finish();
}
