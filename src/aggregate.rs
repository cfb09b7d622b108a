//! Per-bucket statistic accumulation.
//!
//! Records are first labeled with a bucket index, then three independent
//! aggregations run over the labeled set: sent-text concatenation,
//! sent/received counts, and the contiguous-run conversation count.

use crate::models::{BucketAggregate, MessageRecord, MessageType};
use crate::window::BucketWindows;

/// Label every record with the bucket its date falls into, if any.
///
/// Membership is computed identically for sent and received messages;
/// records outside all intervals get no label and contribute to no
/// aggregate.
#[must_use]
pub fn assign_time_buckets(
    records: &[MessageRecord],
    windows: &BucketWindows,
) -> Vec<Option<usize>> {
    records
        .iter()
        .map(|record| windows.bucket_index(record.date))
        .collect()
}

/// Space-joined text of all sent records per bucket, preserving record
/// order.
#[must_use]
pub fn concat_sent_messages(
    records: &[MessageRecord],
    labels: &[Option<usize>],
    bucket_count: usize,
) -> Vec<String> {
    let mut texts: Vec<Vec<&str>> = vec![Vec::new(); bucket_count];

    for (record, label) in records.iter().zip(labels) {
        if record.message_type == MessageType::Sent {
            if let Some(bucket) = label {
                texts[*bucket].push(record.text.as_str());
            }
        }
    }

    texts.into_iter().map(|t| t.join(" ")).collect()
}

/// Sent and received message counts per bucket.
#[must_use]
pub fn sent_received_counts(
    records: &[MessageRecord],
    labels: &[Option<usize>],
    bucket_count: usize,
) -> (Vec<usize>, Vec<usize>) {
    let mut sent = vec![0usize; bucket_count];
    let mut received = vec![0usize; bucket_count];

    for (record, label) in records.iter().zip(labels) {
        if let Some(bucket) = label {
            match record.message_type {
                MessageType::Sent => sent[*bucket] += 1,
                MessageType::Received => received[*bucket] += 1,
            }
        }
    }

    (sent, received)
}

/// Contiguous-run conversation count per bucket.
///
/// Walks the bucket's records in their existing order and counts every
/// transition where the contact differs from the previous in-bucket
/// record's contact. A conversation that reappears after an interruption is
/// counted again; this is inherited behavior, not a distinct-contact count.
#[must_use]
pub fn unique_conversation_counts(
    records: &[MessageRecord],
    labels: &[Option<usize>],
    bucket_count: usize,
) -> Vec<usize> {
    let mut counts = vec![0usize; bucket_count];

    for bucket in 0..bucket_count {
        let mut prev: &str = "";
        for (record, label) in records.iter().zip(labels) {
            if *label == Some(bucket) {
                if record.contact != prev {
                    counts[bucket] += 1;
                }
                prev = record.contact.as_str();
            }
        }
    }

    counts
}

/// Run all three aggregations and shape one [`BucketAggregate`] per bucket.
#[must_use]
pub fn aggregate_buckets(records: &[MessageRecord], windows: &BucketWindows) -> Vec<BucketAggregate> {
    let labels = assign_time_buckets(records, windows);
    let bucket_count = windows.bucket_count();

    let messages = concat_sent_messages(records, &labels, bucket_count);
    let (sent, received) = sent_received_counts(records, &labels, bucket_count);
    let conversations = unique_conversation_counts(records, &labels, bucket_count);

    messages
        .into_iter()
        .zip(sent)
        .zip(received)
        .zip(conversations)
        .enumerate()
        .map(
            |(i, (((messages, sent), received), unique_conversations))| BucketAggregate {
                bucket_start: windows.bucket_start(i),
                month_offset: windows.month_offset(i),
                messages,
                sent,
                received,
                unique_conversations,
            },
        )
        .collect()
}
