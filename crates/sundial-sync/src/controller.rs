//! The two-phase synchronization controller
//!
//! ACQUIRING: exchange with the time source, hard-set the local clock to the
//! server transmit timestamp, and repeat until the measured offset converges
//! below the threshold. This deliberately blocks the caller until the initial
//! time is correct.
//!
//! STEADY: once per local second, when the second lands on the poll cadence,
//! fire a request without blocking; on a later tick collect the reply with a
//! short timeout and apply a damped correction gated on sample trust. A
//! timed-out or rejected exchange is skipped, never escalated: the clock
//! free-runs until a reply is accepted again.

use std::time::Duration;

use sundial_core::{NtpInstant, SharedClock, SundialError, SundialResult};
use sundial_transport::Datagram;
use sundial_wire::Packet;

use crate::{check_reply, OffsetSample, ServerRegistry};

/// Numeric policy for the discipline loop.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Acquisition ends once |offset| drops below this.
    pub convergence_threshold_micros: i64,
    /// Fraction of `offset * poll` applied per steady correction.
    pub damping: f64,
    /// Ceiling on the effective poll interval, seconds.
    pub max_poll_secs: u64,
    /// RTT sanity bound for trusting a sample, microseconds.
    pub rtt_bound_micros: i64,
    /// A server more precise than this is trusted despite a large RTT.
    pub precision_floor_secs: f64,
    /// Receive budget for one reply.
    pub recv_timeout: Duration,
    /// Receive buffer size.
    pub max_reply_len: usize,
    /// Pause between scheduling ticks in `run`.
    pub tick_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            convergence_threshold_micros: 500,
            damping: 0.05,
            max_poll_secs: 30,
            rtt_bound_micros: 30_000,
            precision_floor_secs: 1e-5,
            recv_timeout: Duration::from_millis(100),
            max_reply_len: 1024,
            tick_interval: Duration::from_millis(10),
        }
    }
}

/// Controller phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Acquiring,
    Steady,
}

/// What one scheduling tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing due this tick.
    Idle,
    /// A request left with a fresh T0.
    Sent,
    /// Exchange timed out or the reply was rejected; retry next cadence.
    Skipped,
    /// Accepted an untrusted sample: registry updated, no correction.
    Untrusted,
    /// Applied a damped correction of this many microseconds.
    Corrected(i64),
}

/// Running counters, readable from display/reporting contexts.
#[derive(Clone, Debug, Default)]
pub struct SyncStats {
    pub accepted: u64,
    pub rejected: u64,
    pub corrections: u64,
    pub last_offset_micros: i64,
    pub last_rtt_micros: i64,
    pub last_correction_micros: i64,
}

/// Drives the packet exchange and disciplines the local clock.
///
/// Single mutation authority over the clock and registry; everything else
/// reads through [`SharedClock`] and the accessors here.
pub struct SyncController<T: Datagram> {
    transport: T,
    clock: SharedClock,
    config: SyncConfig,
    registry: ServerRegistry,
    phase: Phase,
    poll_secs: u64,
    /// Second-of-epoch last handled by `tick`; explicit state, not a hidden
    /// static.
    last_serviced_second: Option<u64>,
    /// A request is in flight. A timed-out request is abandoned, never
    /// re-sent with the same T0.
    pending: bool,
    stats: SyncStats,
}

impl<T: Datagram> SyncController<T> {
    pub fn new(transport: T, clock: SharedClock) -> Self {
        Self::with_config(transport, clock, SyncConfig::default())
    }

    pub fn with_config(transport: T, clock: SharedClock, config: SyncConfig) -> Self {
        SyncController {
            transport,
            clock,
            config,
            registry: ServerRegistry::new(),
            phase: Phase::Acquiring,
            poll_secs: 1,
            last_serviced_second: None,
            pending: false,
            stats: SyncStats::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Effective poll interval, seconds (clamped to 1..=max).
    pub fn poll_secs(&self) -> u64 {
        self.poll_secs
    }

    pub fn registry(&self) -> &ServerRegistry {
        &self.registry
    }

    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    /// Initial acquisition: block until the measured offset converges.
    ///
    /// There is no retry ceiling; a failed exchange is retried after the
    /// current poll delay. Callers wanting a bound should wrap this future in
    /// a timeout.
    pub async fn acquire(&mut self) {
        loop {
            match self.exchange_once().await {
                Ok((packet, received_at)) => match self.accept(&packet, received_at) {
                    Ok(sample) => {
                        // Hard set, not offset-corrected, during acquisition.
                        self.clock.set_ntp(packet.transmit);
                        tracing::info!(
                            server = %packet.reference_ip(),
                            offset = sample.offset_micros,
                            rtt = sample.rtt_micros,
                            poll = self.poll_secs,
                            "acquisition exchange"
                        );
                        if sample.offset_micros.abs() < self.config.convergence_threshold_micros {
                            self.phase = Phase::Steady;
                            self.last_serviced_second = None;
                            tracing::info!(
                                offset = sample.offset_micros,
                                "clock acquired, entering steady discipline"
                            );
                            return;
                        }
                    }
                    Err(e) => {
                        self.stats.rejected += 1;
                        tracing::warn!(error = %e, "reply rejected during acquisition");
                    }
                },
                Err(e) => {
                    self.stats.rejected += 1;
                    tracing::warn!(error = %e, "exchange failed during acquisition");
                }
            }
            tokio::time::sleep(Duration::from_secs(self.poll_secs)).await;
        }
    }

    /// One steady-phase scheduling tick.
    ///
    /// On the first tick of a new second that lands on the poll cadence, send
    /// a request stamped with a fresh T0. On later ticks within the same
    /// second, collect the reply with a short timeout.
    pub async fn tick(&mut self) -> TickOutcome {
        let epoch = self.clock.epoch_secs();

        if self.last_serviced_second != Some(epoch) {
            self.last_serviced_second = Some(epoch);
            if epoch % self.poll_secs != 0 {
                return TickOutcome::Idle;
            }
            let mut request = Packet::client_request();
            request.transmit = self.clock.now_ntp();
            if let Err(e) = self.transport.send(&request.to_bytes()).await {
                tracing::warn!(error = %e, "request send failed");
                return TickOutcome::Skipped;
            }
            self.pending = true;
            return TickOutcome::Sent;
        }

        if !self.pending {
            return TickOutcome::Idle;
        }

        match self
            .transport
            .recv_timeout(self.config.max_reply_len, self.config.recv_timeout)
            .await
        {
            Ok(Some(bytes)) => {
                let received_at = self.clock.now_ntp();
                self.pending = false;
                let packet = match Packet::parse(&bytes) {
                    Ok(packet) => packet,
                    Err(e) => {
                        self.stats.rejected += 1;
                        tracing::warn!(error = %e, "reply discarded");
                        return TickOutcome::Skipped;
                    }
                };
                match self.accept(&packet, received_at) {
                    Ok(sample) => self.apply(&packet, sample),
                    Err(e) => {
                        self.stats.rejected += 1;
                        tracing::warn!(error = %e, "reply rejected");
                        TickOutcome::Skipped
                    }
                }
            }
            Ok(None) => {
                // Abandon the pending exchange; the next cadence builds a
                // fresh request.
                self.pending = false;
                self.stats.rejected += 1;
                TickOutcome::Skipped
            }
            Err(e) => {
                self.pending = false;
                self.stats.rejected += 1;
                tracing::warn!(error = %e, "receive failed");
                TickOutcome::Skipped
            }
        }
    }

    /// Acquire, then tick forever at the configured interval. The sleep is
    /// the cooperative yield point; nothing here blocks the runtime.
    pub async fn run(&mut self) {
        if self.phase == Phase::Acquiring {
            self.acquire().await;
        }
        loop {
            self.tick().await;
            tokio::time::sleep(self.config.tick_interval).await;
        }
    }

    /// One blocking request/reply exchange with a fresh T0.
    async fn exchange_once(&mut self) -> SundialResult<(Packet, NtpInstant)> {
        let mut request = Packet::client_request();
        request.transmit = self.clock.now_ntp();
        self.transport.send(&request.to_bytes()).await?;

        let reply = self
            .transport
            .recv_timeout(self.config.max_reply_len, self.config.recv_timeout)
            .await?;
        // T3 is stamped at local reception time, never taken from the wire.
        let received_at = self.clock.now_ntp();

        let bytes = reply.ok_or(SundialError::Timeout)?;
        Ok((Packet::parse(&bytes)?, received_at))
    }

    /// Validate a reply and fold it into controller state. The registry and
    /// poll interval are updated on every accepted reply, whether or not the
    /// sample later proves trustworthy.
    fn accept(&mut self, packet: &Packet, received_at: NtpInstant) -> SundialResult<OffsetSample> {
        check_reply(packet, received_at)?;

        let sample = OffsetSample::from_exchange(
            packet.originate,
            packet.receive,
            packet.transmit,
            received_at,
        );

        self.registry.observe(
            packet.reference_id,
            packet.poll_interval_secs(),
            self.clock.epoch_secs(),
        );
        self.poll_secs = packet.poll_interval_secs().clamp(1, self.config.max_poll_secs);

        self.stats.accepted += 1;
        self.stats.last_offset_micros = sample.offset_micros;
        self.stats.last_rtt_micros = sample.rtt_micros;

        Ok(sample)
    }

    /// Apply the damped correction for a trusted sample.
    fn apply(&mut self, packet: &Packet, sample: OffsetSample) -> TickOutcome {
        match sample.check_trusted(
            self.config.rtt_bound_micros,
            packet.precision_secs(),
            self.config.precision_floor_secs,
        ) {
            Ok(()) => {
                let correction = (sample.offset_micros as f64
                    * self.poll_secs as f64
                    * self.config.damping) as i64;
                if correction != 0 {
                    self.clock.adjust(correction);
                    self.stats.corrections += 1;
                }
                self.stats.last_correction_micros = correction;
                tracing::info!(
                    server = %packet.reference_ip(),
                    header = %packet,
                    offset = sample.offset_micros,
                    rtt = sample.rtt_micros,
                    poll = self.poll_secs,
                    correction,
                    "steady correction"
                );
                TickOutcome::Corrected(correction)
            }
            Err(e) => {
                self.stats.last_correction_micros = 0;
                tracing::warn!(
                    error = %e,
                    offset = sample.offset_micros,
                    rtt = sample.rtt_micros,
                    "sample untrusted, correction skipped"
                );
                TickOutcome::Untrusted
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use sundial_core::SundialResult;
    use sundial_wire::{Mode, PROTOCOL_VERSION};

    /// Scripted time source: keeps its own free-running clock and answers
    /// every request instantly. Panics past its exchange budget so a broken
    /// convergence loop fails instead of hanging.
    #[derive(Clone)]
    struct MockServer {
        server_clock: SharedClock,
        poll: u8,
        precision: i8,
        inner: Arc<MockInner>,
    }

    struct MockInner {
        queue: Mutex<VecDeque<Vec<u8>>>,
        sends: AtomicU64,
        budget: u64,
    }

    impl MockServer {
        fn new(server_clock: SharedClock, poll: u8, precision: i8) -> Self {
            MockServer {
                server_clock,
                poll,
                precision,
                inner: Arc::new(MockInner {
                    queue: Mutex::new(VecDeque::new()),
                    sends: AtomicU64::new(0),
                    budget: 10,
                }),
            }
        }

        fn sends(&self) -> u64 {
            self.inner.sends.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Datagram for MockServer {
        async fn send(&self, payload: &[u8]) -> SundialResult<()> {
            let sends = self.inner.sends.fetch_add(1, Ordering::SeqCst) + 1;
            if sends > self.inner.budget {
                panic!("mock exchange budget exceeded");
            }

            let request = Packet::parse(payload).unwrap();
            let now = self.server_clock.now_ntp();

            let mut reply = Packet::client_request();
            reply.version = PROTOCOL_VERSION;
            reply.mode = Mode::Server;
            reply.stratum = 2;
            reply.poll = self.poll;
            reply.precision = self.precision;
            reply.reference_id = [192, 0, 2, 1];
            reply.originate = request.transmit;
            reply.receive = now;
            reply.transmit = now;

            self.inner.queue.lock().push_back(reply.to_bytes());
            Ok(())
        }

        async fn recv_timeout(
            &self,
            _max_len: usize,
            _timeout: Duration,
        ) -> SundialResult<Option<Vec<u8>>> {
            Ok(self.inner.queue.lock().pop_front())
        }
    }

    fn clock_at(secs: u64) -> SharedClock {
        let clock = SharedClock::new();
        clock.set(secs, 0);
        clock
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquisition_converges_on_constant_offset() {
        let local = clock_at(1_700_000_000);
        // Server runs a constant 2s ahead of where the local clock started.
        let server = clock_at(1_700_000_002);
        let mock = MockServer::new(server.clone(), 6, -20);

        let mut controller = SyncController::new(mock.clone(), local.clone());
        controller.acquire().await;

        assert_eq!(controller.phase(), Phase::Steady);
        // Noiseless input: the first hard set lands, the second confirms.
        assert!(mock.sends() <= 4, "took {} exchanges", mock.sends());
        // Local clock now tracks the server.
        let residual = local.now_ntp().micros_since(server.now_ntp());
        assert!(residual.abs() < 100_000, "residual {residual}us");
        // Server poll 2^6 = 64s clamps to the 30s ceiling.
        assert_eq!(controller.poll_secs(), 30);
        assert_eq!(controller.registry().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquisition_skips_rejected_replies() {
        let local = clock_at(1_700_000_000);
        let server = clock_at(1_700_000_000);
        // Mode stays Client: every reply is rejected, never converges.
        let mock = MockServer::new(server, 0, -20);

        let mut controller = SyncController::new(
            BadModeTransport(mock.clone()),
            local,
        );
        let acquired = tokio::time::timeout(Duration::from_secs(5), controller.acquire()).await;
        assert!(acquired.is_err(), "must not converge on rejected replies");
        assert_eq!(controller.phase(), Phase::Acquiring);
        assert!(controller.stats().rejected > 0);
        assert_eq!(controller.registry().len(), 0);
    }

    /// Wraps the mock and corrupts the mode bits of every reply.
    struct BadModeTransport(MockServer);

    #[async_trait]
    impl Datagram for BadModeTransport {
        async fn send(&self, payload: &[u8]) -> SundialResult<()> {
            self.0.send(payload).await
        }

        async fn recv_timeout(
            &self,
            max_len: usize,
            timeout: Duration,
        ) -> SundialResult<Option<Vec<u8>>> {
            Ok(self.0.recv_timeout(max_len, timeout).await?.map(|mut b| {
                b[0] = (b[0] & !0b111) | Mode::Client.to_bits();
                b
            }))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_steady_applies_damped_correction() {
        let local = clock_at(1_700_000_000);
        // 1s offset, server poll 2^2 = 4s.
        let server = clock_at(1_700_000_001);
        let mock = MockServer::new(server, 2, -20);

        let mut controller = SyncController::new(mock, local.clone());
        controller.phase = Phase::Steady;

        let before = local.now_ntp();
        assert_eq!(controller.tick().await, TickOutcome::Sent);
        let outcome = controller.tick().await;

        // correction = offset * poll * damping = 1e6 * 4 * 0.05.
        let TickOutcome::Corrected(correction) = outcome else {
            panic!("expected correction, got {outcome:?}");
        };
        assert!(
            (180_000..=220_000).contains(&correction),
            "correction {correction}us"
        );
        let moved = local.now_ntp().micros_since(before);
        assert!((moved - correction).abs() < 10_000, "clock moved {moved}us");
        assert_eq!(controller.stats().corrections, 1);
        assert_eq!(controller.poll_secs(), 4);
        // Raw (unclamped) advertised interval lands in the registry.
        assert_eq!(
            controller.registry().get(&[192, 0, 2, 1]).unwrap().poll_secs,
            4
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_untrusted_sample_updates_registry_only() {
        let local = clock_at(1_700_000_000);
        let server = clock_at(1_700_000_001);
        // Coarse server (2^-3 s) so precision cannot rescue the sample.
        let mock = MockServer::new(server, 2, -3);

        let mut controller = SyncController::new(SlowTransport(mock, 40_000), local.clone());
        controller.phase = Phase::Steady;

        let before = local.now_ntp();
        assert_eq!(controller.tick().await, TickOutcome::Sent);
        assert_eq!(controller.tick().await, TickOutcome::Untrusted);

        // Registry still sees the server; the clock was left alone.
        assert_eq!(controller.registry().len(), 1);
        assert_eq!(controller.stats().corrections, 0);
        let moved = local.now_ntp().micros_since(before);
        assert!(moved < 5_000, "clock moved {moved}us");
    }

    /// Wraps the mock and backdates the echoed T0, which makes the exchange
    /// look 40ms slower than it was and pushes the RTT past the sanity bound.
    struct SlowTransport(MockServer, i64);

    #[async_trait]
    impl Datagram for SlowTransport {
        async fn send(&self, payload: &[u8]) -> SundialResult<()> {
            self.0.send(payload).await
        }

        async fn recv_timeout(
            &self,
            max_len: usize,
            timeout: Duration,
        ) -> SundialResult<Option<Vec<u8>>> {
            let reply = self.0.recv_timeout(max_len, timeout).await?;
            Ok(reply.map(|mut bytes| {
                let packet = Packet::parse(&bytes).unwrap();
                let backdated = packet.originate.offset_by(-self.1);
                bytes[24..32].copy_from_slice(&sundial_wire::encode_timestamp(backdated));
                bytes
            }))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_services_each_second_once() {
        let local = clock_at(1_700_000_000);
        let server = clock_at(1_700_000_000);
        let mock = MockServer::new(server, 0, -20);

        let mut controller = SyncController::new(mock, local);
        controller.phase = Phase::Steady;

        // First tick of the second sends; the next collects; further ticks in
        // the same second are idle.
        assert_eq!(controller.tick().await, TickOutcome::Sent);
        assert!(matches!(controller.tick().await, TickOutcome::Corrected(_)));
        assert_eq!(controller.tick().await, TickOutcome::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_abandons_pending_request() {
        let local = clock_at(1_700_000_000);
        let server = clock_at(1_700_000_000);
        let mock = MockServer::new(server, 0, -20);

        let mut controller = SyncController::new(
            DeafTransport(mock.clone()),
            local,
        );
        controller.phase = Phase::Steady;

        assert_eq!(controller.tick().await, TickOutcome::Sent);
        assert_eq!(controller.tick().await, TickOutcome::Skipped);
        // The lost exchange is abandoned, not escalated.
        assert_eq!(controller.tick().await, TickOutcome::Idle);
        assert_eq!(controller.stats().rejected, 1);
    }

    /// Accepts sends but never yields a reply.
    struct DeafTransport(MockServer);

    #[async_trait]
    impl Datagram for DeafTransport {
        async fn send(&self, payload: &[u8]) -> SundialResult<()> {
            self.0.send(payload).await
        }

        async fn recv_timeout(
            &self,
            _max_len: usize,
            _timeout: Duration,
        ) -> SundialResult<Option<Vec<u8>>> {
            Ok(None)
        }
    }
}
