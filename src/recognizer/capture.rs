use super::format::AudioFormat;
use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleRate, StreamConfig};
use ringbuf::{HeapRb, traits::*};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;

/// Microphone capture scoped to a single utterance.
///
/// `begin` opens the default input device and pushes samples into a ring
/// buffer; a bridge task forwards them over `chunk_tx` in half-second
/// chunks. `stop` tears the stream down and wakes the bridge one last time
/// so it can flush whatever is left in the ring — including the partial
/// chunk holding the end of the utterance — before dropping its sender and
/// exiting. One capture, one bridge, one channel; nothing outlives the
/// session.
pub struct UtteranceCapture {
    stream: cpal::Stream,
    stopping: Arc<AtomicBool>,
    wakeup: Arc<Notify>,
    bridge: JoinHandle<()>,
}

impl UtteranceCapture {
    /// Start capturing. Fails before any stream is built if the host has no
    /// input device — the "speech capture unavailable" condition, which the
    /// caller surfaces instead of crashing.
    pub fn begin(format: AudioFormat, chunk_tx: mpsc::Sender<Vec<f32>>) -> Result<Self> {
        let ring = HeapRb::<f32>::new(format.samples_for_duration(60.0));
        let (mut producer, consumer) = ring.split();

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .context("No input audio device available")?;

        let config = StreamConfig {
            channels: format.channels,
            sample_rate: SampleRate(format.sample_rate),
            buffer_size: BufferSize::Default,
        };

        let wakeup = Arc::new(Notify::new());
        let stopping = Arc::new(AtomicBool::new(false));
        let wakeup_callback = wakeup.clone();

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                    producer.push_slice(data);
                    wakeup_callback.notify_one();
                },
                move |err| {
                    tracing::error!("Audio stream error: {}", err);
                },
                None,
            )
            .context("Failed to build input stream")?;

        stream.play().context("Failed to start audio stream")?;

        let bridge = tokio::task::spawn_local(run_bridge(
            consumer,
            chunk_tx,
            format.samples_for_duration(0.5),
            wakeup.clone(),
            stopping.clone(),
        ));

        tracing::info!("Microphone capture started");
        Ok(Self {
            stream,
            stopping,
            wakeup,
            bridge,
        })
    }

    /// Stop capturing and hand back the bridge task.
    ///
    /// The input stream is dropped before the bridge is woken, so the ring
    /// can only shrink from here. The caller drains the chunk channel until
    /// the bridge's final flush closes it, then awaits the returned handle.
    pub fn stop(self) -> JoinHandle<()> {
        drop(self.stream);
        self.stopping.store(true, Ordering::Release);
        self.wakeup.notify_one();
        self.bridge
    }
}

/// Move samples from the realtime ring buffer onto the async channel.
///
/// While capture is live, only full chunks are forwarded. Once the stopping
/// flag is set the remainder of the ring is flushed, partial chunk included,
/// and the task exits, closing the channel.
async fn run_bridge(
    mut consumer: impl Consumer<Item = f32>,
    tx: mpsc::Sender<Vec<f32>>,
    chunk_size: usize,
    wakeup: Arc<Notify>,
    stopping: Arc<AtomicBool>,
) {
    loop {
        wakeup.notified().await;

        if stopping.load(Ordering::Acquire) {
            break;
        }

        while consumer.occupied_len() >= chunk_size {
            if send_chunk(&mut consumer, &tx, chunk_size).await.is_err() {
                return;
            }
        }
    }

    while consumer.occupied_len() > 0 {
        let n = consumer.occupied_len().min(chunk_size);
        if send_chunk(&mut consumer, &tx, n).await.is_err() {
            return;
        }
    }
}

async fn send_chunk(
    consumer: &mut impl Consumer<Item = f32>,
    tx: &mpsc::Sender<Vec<f32>>,
    n: usize,
) -> Result<(), ()> {
    let mut chunk = vec![0.0f32; n];
    let got = consumer.pop_slice(&mut chunk);
    chunk.truncate(got);
    tx.send(chunk).await.map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bridge_flushes_ring_tail_on_stop_and_exits() {
        let ring = HeapRb::<f32>::new(1024);
        let (mut producer, consumer) = ring.split();
        let (tx, mut rx) = mpsc::channel(10);
        let wakeup = Arc::new(Notify::new());
        let stopping = Arc::new(AtomicBool::new(false));

        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let bridge = tokio::task::spawn_local(run_bridge(
                    consumer,
                    tx,
                    100,
                    wakeup.clone(),
                    stopping.clone(),
                ));

                // One full chunk plus a 30-sample tail, as at the end of
                // speech.
                producer.push_slice(&[0.25f32; 130]);
                wakeup.notify_one();

                let first = rx.recv().await.unwrap();
                assert_eq!(first.len(), 100);

                stopping.store(true, Ordering::Release);
                wakeup.notify_one();

                // The tail below chunk_size is flushed, not dropped.
                let tail = rx.recv().await.unwrap();
                assert_eq!(tail.len(), 30);

                // The sender is gone: the bridge exited instead of parking
                // on the notify forever.
                assert!(rx.recv().await.is_none());
                bridge.await.unwrap();
            })
            .await;
    }

    #[tokio::test]
    async fn bridge_holds_partial_chunks_while_live() {
        let ring = HeapRb::<f32>::new(1024);
        let (mut producer, consumer) = ring.split();
        let (tx, mut rx) = mpsc::channel(10);
        let wakeup = Arc::new(Notify::new());
        let stopping = Arc::new(AtomicBool::new(false));

        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let bridge = tokio::task::spawn_local(run_bridge(
                    consumer,
                    tx,
                    100,
                    wakeup.clone(),
                    stopping.clone(),
                ));

                producer.push_slice(&[0.5f32; 40]);
                wakeup.notify_one();

                // Below chunk_size: nothing is forwarded yet.
                assert!(rx.try_recv().is_err());

                stopping.store(true, Ordering::Release);
                wakeup.notify_one();

                assert_eq!(rx.recv().await.unwrap().len(), 40);
                assert!(rx.recv().await.is_none());
                bridge.await.unwrap();
            })
            .await;
    }
}
