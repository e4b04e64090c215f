//! ### English
//! Randomized interleavings of concurrent producer/consumer releases.
//!
//! The race property under test: dropping the consumer reference from the
//! consumer thread while the producer reference is dropped concurrently from
//! the home thread fires the callback exactly once, always on the home thread.
//!
//! ### 中文
//! 生产者/消费者并发释放的随机交错测试。
//!
//! 被测竞争性质：消费者线程释放消费者引用、home 线程同时释放生产者引用时，
//! 回调恰好触发一次，且始终在 home 线程。

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;

use texture_mailbox::{
    Mailbox, MailboxDescriptor, SyncPoint, TaskQueue, TextureConsumer, TextureProducer,
};

type Delivered = Arc<Mutex<Vec<(SyncPoint, bool, thread::ThreadId)>>>;

const ROUNDS: u32 = 200;

#[test]
fn concurrent_releases_fire_exactly_once_on_home_thread() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (queue, runner) = TaskQueue::new();
    let home = thread::current().id();
    let mut rng = rand::rng();

    for round in 0..ROUNDS {
        let delivered: Delivered = Arc::new(Mutex::new(Vec::new()));
        let sink = delivered.clone();

        let mut producer = TextureProducer::new(runner.clone());
        producer.publish(
            MailboxDescriptor::new(Mailbox::new([(round % 251 + 1) as u8; 16]), 1),
            Some(Box::new(move |sync_point, lost| {
                sink.lock().push((sync_point, lost, thread::current().id()));
            })),
        );

        let mut consumer = TextureConsumer::new();
        assert!(producer.push_to(&mut consumer));

        let consumer_delay = rng.random_range(0..40u64);
        let producer_delay = rng.random_range(0..40u64);
        let action = rng.random_range(0..3u8);

        let consumer_thread = thread::spawn(move || {
            thread::sleep(Duration::from_micros(consumer_delay));
            match action {
                0 => drop(consumer),
                1 => {
                    consumer.detach();
                    drop(consumer);
                }
                _ => {
                    consumer.return_status(u64::from(round) + 2, false);
                    drop(consumer);
                }
            }
        });

        thread::sleep(Duration::from_micros(producer_delay));
        producer.clear();
        consumer_thread.join().unwrap();

        /*
        ### English
        Both references are gone after the join. Either the zero crossing was
        on the home thread (already delivered inline) or a delivery task is
        queued; drain until the callback shows up.

        ### 中文
        join 之后两个引用均已释放。过零点要么发生在 home 线程（已就地投递），
        要么已有投递任务入队；drain 直到回调出现。
        */
        while delivered.lock().is_empty() {
            assert!(
                queue.run_one(Duration::from_secs(5)),
                "round {round}: release callback never delivered"
            );
        }
        queue.run_pending();

        let events = delivered.lock();
        assert_eq!(events.len(), 1, "round {round}: callback count");
        assert_eq!(events[0].2, home, "round {round}: delivery thread");
    }
}

#[test]
fn rapid_republish_under_consumer_churn_releases_every_texture() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (queue, runner) = TaskQueue::new();
    let mut rng = rand::rng();

    let released = Arc::new(Mutex::new(Vec::<u8>::new()));
    let mut producer = TextureProducer::new(runner);
    let mut consumer: Option<TextureConsumer> = None;
    let mut published = 0u8;

    for _ in 0..100 {
        published += 1;
        let sink = released.clone();
        producer.publish(
            MailboxDescriptor::new(Mailbox::new([published; 16]), u64::from(published)),
            Some(Box::new(move |_, _| sink.lock().push(published))),
        );

        /*
        ### English
        Randomly deliver this commit, retire the consumer generation, or
        replace the texture again before it was ever delivered.

        ### 中文
        随机选择：交付本次 commit、让消费者一代退役，或在纹理交付之前再次替换。
        */
        match rng.random_range(0..3u8) {
            0 => {
                let mut next = TextureConsumer::new();
                producer.push_to(&mut next);
                if let Some(outgoing) = consumer.replace(next) {
                    thread::spawn(move || drop(outgoing)).join().unwrap();
                }
            }
            1 => {
                consumer = None;
            }
            _ => {}
        }
        queue.run_pending();
    }

    producer.clear();
    drop(consumer);
    queue.run_pending();

    let mut seen = released.lock().clone();
    seen.sort_unstable();
    let expected: Vec<u8> = (1..=published).collect();
    assert_eq!(seen, expected, "every published texture released exactly once");
}
