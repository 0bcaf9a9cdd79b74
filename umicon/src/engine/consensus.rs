use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use rust_htslib::bam::record::{Aux, Record};

use crate::bam_io::record_util;
use crate::engine::cluster::ConsensusPair;
use crate::engine::pair::ReadPair;
use crate::options::ConsensusParams;

const FLAG_DUPLICATE: u16 = 0x400;

/// Collapse one UMI group into a consensus pair, one record per mate side
/// that has any contributors.
pub fn consensus_pair(members: Vec<ReadPair>, params: &ConsensusParams) -> Result<ConsensusPair> {
    let reads = members.len();
    let mut lefts = Vec::new();
    let mut rights = Vec::new();
    for member in members {
        if let Some(record) = member.left {
            lefts.push(record);
        }
        if let Some(record) = member.right {
            rights.push(record);
        }
    }
    Ok(ConsensusPair {
        left: consensus_read(lefts, reads, params)?,
        right: consensus_read(rights, reads, params)?,
        reads,
    })
}

/// The template anchors the consensus: longest reference span, then fewest
/// mismatches, then the lexicographically smallest name.
fn elect_template(records: &[Record]) -> usize {
    let mut best = 0;
    for idx in 1..records.len() {
        if better_template(&records[idx], &records[best]) {
            best = idx;
        }
    }
    best
}

fn better_template(candidate: &Record, incumbent: &Record) -> bool {
    record_util::reference_span(candidate)
        .cmp(&record_util::reference_span(incumbent))
        .then_with(|| {
            record_util::edit_distance(incumbent).cmp(&record_util::edit_distance(candidate))
        })
        .then_with(|| incumbent.qname().cmp(candidate.qname()))
        .is_gt()
}

fn consensus_read(
    mut records: Vec<Record>,
    group_size: usize,
    params: &ConsensusParams,
) -> Result<Option<Record>> {
    if records.is_empty() {
        return Ok(None);
    }
    if records.len() == 1 {
        // a lone contributor passes through untouched, minus the duplicate bit
        let mut only = records.swap_remove(0);
        only.set_flags(only.flags() & !FLAG_DUPLICATE);
        return Ok(Some(only));
    }

    let template_idx = elect_template(&records);
    let template = &records[template_idx];
    let template_seq = template.seq().as_bytes();
    let mut seq = template_seq.clone();
    let mut qual = template.qual().to_vec();

    let seqs: Vec<Vec<u8>> = records.iter().map(|record| record.seq().as_bytes()).collect();
    let quals: Vec<&[u8]> = records.iter().map(|record| record.qual()).collect();
    let lookups: Vec<HashMap<i64, usize>> = records
        .iter()
        .map(|record| {
            record_util::aligned_ref_positions(record)
                .into_iter()
                .map(|(read_idx, ref_pos)| (ref_pos, read_idx))
                .collect()
        })
        .collect();

    for (read_idx, ref_pos) in record_util::aligned_ref_positions(template) {
        let mut votes: Vec<(u8, u8)> = Vec::with_capacity(records.len());
        for contributor in 0..records.len() {
            if let Some(&other_idx) = lookups[contributor].get(&ref_pos) {
                votes.push((seqs[contributor][other_idx], quals[contributor][other_idx]));
            }
        }
        if votes.len() < 2 {
            // only the template reaches this position; the ceiling still applies
            qual[read_idx] = qual[read_idx].min(params.quality_cap);
            continue;
        }

        let template_base = template_seq[read_idx];
        let mut scores: BTreeMap<u8, u32> = BTreeMap::new();
        for (base, quality) in &votes {
            *scores.entry(*base).or_insert(0) += *quality as u32;
        }
        // the template base wins unless some base outscores it outright
        let mut winner = template_base;
        let mut winner_score = scores.get(&template_base).copied().unwrap_or(0);
        for (base, score) in &scores {
            if *score > winner_score {
                winner = *base;
                winner_score = *score;
            }
        }

        let mut winner_quality = votes
            .iter()
            .filter(|(base, _)| *base == winner)
            .map(|(_, quality)| *quality)
            .max()
            .unwrap_or(0)
            .min(params.quality_cap);
        let high_dissent =
            votes.iter().any(|(base, quality)| *base != winner && *quality >= params.high_quality);
        if high_dissent {
            winner_quality = winner_quality.saturating_sub(params.dissent_penalty);
        }
        seq[read_idx] = winner;
        qual[read_idx] = winner_quality;
    }

    let mut qname = template.qname().to_vec();
    if params.label_group_size {
        qname.extend_from_slice(format!(":cs:{}", group_size).as_bytes());
    }
    let edit_distance =
        seq.iter().zip(template_seq.iter()).filter(|(called, original)| called != original).count();
    let cigar = template.cigar().take();

    let mut consensus = Record::new();
    consensus.set(&qname, Some(&cigar), &seq, &qual);
    consensus.set_tid(template.tid());
    consensus.set_pos(template.pos());
    consensus.set_mtid(template.mtid());
    consensus.set_mpos(template.mpos());
    consensus.set_insert_size(template.insert_size());
    consensus.set_mapq(template.mapq());
    consensus.set_flags(template.flags() & !FLAG_DUPLICATE);
    consensus.push_aux(b"NM", Aux::I32(edit_distance as i32))?;
    Ok(Some(consensus))
}
