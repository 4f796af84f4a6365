// Interactive demo orchestrator: spawns paced producer/consumer
// workers against one shared queue and answers status queries.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use semq::queue::{Queue, QueueBuilder, DEFAULT_CAPACITY};
use semq::worker::{consumer_loop, producer_loop, CancelToken, WorkerId};

const SEGMENT_NAME: &str = "semq-demo";

/// Delay between worker cycles; paces the demo traffic only.
const PACE: Duration = Duration::from_secs(5);

struct WorkerHandle {
    id: WorkerId,
    token: CancelToken,
    join: JoinHandle<()>,
}

#[derive(Default)]
struct Registry {
    producers: Vec<WorkerHandle>,
    consumers: Vec<WorkerHandle>,
}

fn main() -> io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // The segment and its gate are set up exactly once, before any
    // worker exists, and torn down once after the last one is gone.
    let queue = Arc::new(QueueBuilder::new(SEGMENT_NAME).capacity(DEFAULT_CAPACITY).create()?);
    let registry = Arc::new(Mutex::new(Registry::default()));
    let session = CancelToken::new();

    {
        let session = session.clone();
        let registry = Arc::clone(&registry);
        ctrlc::set_handler(move || {
            session.cancel();
            let reg = registry.lock();
            for worker in reg.producers.iter().chain(reg.consumers.iter()) {
                worker.token.cancel();
            }
            eprintln!("interrupt received; press Enter to exit");
        })
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    }

    println!("Commands:");
    println!("  p - new producer");
    println!("  c - new consumer");
    println!("  k - stop last worker");
    println!("  s - show queue state");
    println!("  q - quit");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    while !session.is_cancelled() {
        let line = match lines.next() {
            Some(line) => line?,
            None => break,
        };
        match line.trim() {
            "p" => spawn_producer(&queue, &registry),
            "c" => spawn_consumer(&queue, &registry),
            "k" => {
                print!("stop [p]roducer or [c]onsumer? ");
                io::stdout().flush()?;
                match lines.next() {
                    Some(answer) => {
                        let mut reg = registry.lock();
                        match answer?.trim() {
                            "p" => stop_last(&mut reg.producers, "producer"),
                            "c" => stop_last(&mut reg.consumers, "consumer"),
                            other => println!("expected p or c, got {:?}", other),
                        }
                    }
                    None => break,
                }
            }
            "s" => print_state(&queue, &registry.lock()),
            "q" => break,
            "" => {}
            other => println!("unknown command: {:?}", other),
        }
    }

    shutdown(&queue, &registry);
    println!("exit");
    Ok(())
}

fn spawn_producer(queue: &Arc<Queue>, registry: &Mutex<Registry>) {
    let id = WorkerId::next();
    let token = CancelToken::new();
    let producer = queue.producer();
    let worker_token = token.clone();
    let join = thread::spawn(move || producer_loop(id, &producer, &worker_token, PACE));
    registry.lock().producers.push(WorkerHandle { id, token, join });
    println!("started producer {}", id);
}

fn spawn_consumer(queue: &Arc<Queue>, registry: &Mutex<Registry>) {
    let id = WorkerId::next();
    let token = CancelToken::new();
    let consumer = queue.consumer();
    let worker_token = token.clone();
    let join = thread::spawn(move || consumer_loop(id, &consumer, &worker_token, PACE));
    registry.lock().consumers.push(WorkerHandle { id, token, join });
    println!("started consumer {}", id);
}

fn stop_last(list: &mut Vec<WorkerHandle>, role: &str) {
    match list.pop() {
        Some(worker) => {
            worker.token.cancel();
            // Give a worker that is between cycles a moment to leave.
            let deadline = Instant::now() + Duration::from_millis(200);
            while !worker.join.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(20));
            }
            if worker.join.is_finished() {
                let _ = worker.join.join();
                println!("stopped {} {}", role, worker.id);
            } else {
                // Detach; it exits after its current cycle, which may
                // wait on a permit only a peer can supply.
                println!(
                    "{} {} is stopping; it exits after its current cycle",
                    role, worker.id
                );
            }
        }
        None => println!("no {} workers to stop", role),
    }
}

fn print_state(queue: &Queue, registry: &Registry) {
    let stats = queue.stats();
    println!();
    println!("=== Queue State ===");
    println!("Capacity:  {}", stats.capacity);
    println!("Used:      {}", stats.count);
    println!("Free:      {}", stats.free());
    println!("Added:     {}", stats.added_total);
    println!("Consumed:  {}", stats.consumed_total);
    println!("Producers: {}", registry.producers.len());
    println!("Consumers: {}", registry.consumers.len());
    println!("===================");
    println!();
}

fn shutdown(queue: &Arc<Queue>, registry: &Mutex<Registry>) {
    let mut reg = registry.lock();
    let reg = &mut *reg;
    for worker in reg.producers.iter().chain(reg.consumers.iter()) {
        worker.token.cancel();
    }

    // A parked worker wakes only when a peer supplies the permit it
    // waits on, so the orchestrator plays that peer until everyone has
    // left: draining feeds empty-slot permits to parked producers,
    // nudge messages feed full-slot permits to parked consumers.
    let producer = queue.producer();
    let consumer = queue.consumer();
    let deadline = Instant::now() + PACE + Duration::from_secs(5);
    loop {
        let producers_done = reg.producers.iter().all(|w| w.join.is_finished());
        let consumers_done = reg.consumers.iter().all(|w| w.join.is_finished());
        if (producers_done && consumers_done) || Instant::now() >= deadline {
            break;
        }
        let _ = consumer.try_recv();
        if !consumers_done {
            let _ = producer.try_send(0, b"shutdown");
        }
        thread::sleep(Duration::from_millis(50));
    }

    for worker in reg.producers.drain(..).chain(reg.consumers.drain(..)) {
        if worker.join.is_finished() {
            let _ = worker.join.join();
        } else {
            log::warn!("worker {} still parked in the gate at exit", worker.id);
        }
    }
}
