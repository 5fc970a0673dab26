use crate::aggregator::MetricAggregator;
use crate::{Error, Result};
use roastwatch_core::clock::Clock;
use roastwatch_core::listeners::Subscription;
use roastwatch_core::report::Report;
use roastwatch_core::vitals::RawVital;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Clock on the tokio timeline, anchored at a wall-clock epoch.
///
/// Follows paused and auto-advanced time in tests.
#[derive(Debug, Clone)]
pub struct TokioClock {
    origin_ms: i64,
    started: Instant,
}

impl TokioClock {
    pub fn new(origin_ms: i64) -> Self {
        Self {
            origin_ms,
            started: Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> i64 {
        self.origin_ms + self.started.elapsed().as_millis() as i64
    }
}

enum Command {
    Record(RawVital),
    Flush,
    Subscribe(mpsc::UnboundedSender<Report>),
}

/// Handle for feeding an [`AggregatorService`]
#[derive(Debug, Clone)]
pub struct MetricSender {
    tx: mpsc::Sender<Command>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Record(raw) => write!(f, "Record({})", raw.name),
            Command::Flush => write!(f, "Flush"),
            Command::Subscribe(_) => write!(f, "Subscribe"),
        }
    }
}

impl MetricSender {
    pub async fn record(&self, raw: RawVital) -> Result<()> {
        self.send(Command::Record(raw)).await
    }

    /// Flush pending metrics without waiting out the quiet period
    pub async fn flush(&self) -> Result<()> {
        self.send(Command::Flush).await
    }

    /// Receive every report flushed from now on
    pub async fn subscribe(&self) -> Result<mpsc::UnboundedReceiver<Report>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.send(Command::Subscribe(tx)).await?;
        Ok(rx)
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.tx.send(command).await.map_err(|_| Error::ServiceStopped)
    }
}

/// Drives a [`MetricAggregator`] from a single task.
///
/// Metrics arrive over a channel; the task sleeps until the pending flush
/// deadline. When every sender is dropped, pending metrics are flushed once
/// and the service ends.
pub struct AggregatorService {
    aggregator: MetricAggregator,
    clock: Box<dyn Clock>,
    rx: mpsc::Receiver<Command>,
    subscribers: Vec<(Subscription, mpsc::UnboundedSender<Report>)>,
}

impl AggregatorService {
    /// `clock` must be the clock the aggregator was built with
    pub fn new(
        aggregator: MetricAggregator,
        clock: impl Clock + 'static,
        buffer: usize,
    ) -> (Self, MetricSender) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (
            Self {
                aggregator,
                clock: Box::new(clock),
                rx,
                subscribers: Vec::new(),
            },
            MetricSender { tx },
        )
    }

    /// Register a report channel before the service is spawned
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<Report> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.attach(tx);
        rx
    }

    /// Run until every [`MetricSender`] is dropped; returns the final report
    /// flushed on shutdown, if any
    pub async fn run(mut self) -> Option<Report> {
        tracing::debug!("Aggregator service started");

        loop {
            let wait = self
                .aggregator
                .pending_deadline()
                .map(|deadline| Duration::from_millis((deadline - self.clock.now_ms()).max(0) as u64));

            tokio::select! {
                command = self.rx.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                _ = sleep(wait), if wait.is_some() => {
                    self.prune_closed();
                    self.aggregator.poll();
                }
            }
        }

        tracing::debug!("Aggregator service stopping");
        self.prune_closed();
        self.aggregator.teardown()
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Record(raw) => {
                if let Err(e) = self.aggregator.record(&raw) {
                    tracing::warn!("Skipping metric {}: {}", raw.name, e);
                }
            }
            Command::Flush => {
                self.prune_closed();
                self.aggregator.flush();
            }
            Command::Subscribe(tx) => self.attach(tx),
        }
    }

    fn attach(&mut self, tx: mpsc::UnboundedSender<Report>) {
        let listener_tx = tx.clone();
        let subscription = self.aggregator.on_report(move |report| {
            listener_tx
                .send(report.clone())
                .map_err(|_| "report receiver dropped".into())
        });
        self.subscribers.push((subscription, tx));
    }

    /// Unsubscribe listeners whose receiver has been dropped
    fn prune_closed(&mut self) {
        let (closed, open): (Vec<_>, Vec<_>) = std::mem::take(&mut self.subscribers)
            .into_iter()
            .partition(|(_, tx)| tx.is_closed());
        self.subscribers = open;

        for (subscription, _) in closed {
            self.aggregator.unsubscribe(subscription);
        }
    }
}

async fn sleep(wait: Option<Duration>) {
    if let Some(wait) = wait {
        tokio::time::sleep(wait).await;
    }
}
