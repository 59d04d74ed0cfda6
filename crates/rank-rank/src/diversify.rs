//! Diversifier (C8, §4.8): xQuAD and PM2 re-ranking over an intent-aware
//! ranking bundle.
//!
//! Tie-breaking (§9 open question, resolved in `SPEC_FULL.md`): every argmax
//! below breaks ties by docid ascending, deterministically, rather than
//! relying on insertion order into a score-keyed map the way the source did.

use std::collections::HashMap;

use rank_retrieve::evaluator::ScoreList;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiversityAlgorithm {
    XQuAD,
    Pm2,
}

/// One query's diversification input: a query baseline and one ranking per
/// intent, truncated to `max_input_rankings_length` before use.
pub struct DiversityInput<'a> {
    pub baseline: &'a ScoreList,
    pub intents: &'a [ScoreList],
    pub lambda: f64,
    pub max_input_rankings_length: usize,
    pub max_result_ranking_length: usize,
}

fn truncated_scores(list: &ScoreList, limit: usize) -> HashMap<u32, f64> {
    list.entries().iter().take(limit).map(|&(d, s)| (d, s)).collect()
}

/// §4.8 normalization: compute the largest column-sum over the baseline and
/// every intent ranking; if every one of those sums is already ≤ 1.0, skip
/// normalization (divisor 1.0).
fn normalization_divisor(baseline: &HashMap<u32, f64>, intents: &[HashMap<u32, f64>]) -> f64 {
    let mut largest = baseline.values().sum::<f64>();
    for intent in intents {
        largest = largest.max(intent.values().sum::<f64>());
    }
    if largest <= 1.0 {
        1.0
    } else {
        largest
    }
}

fn candidate_docids(baseline: &HashMap<u32, f64>) -> Vec<u32> {
    let mut docids: Vec<u32> = baseline.keys().copied().collect();
    docids.sort_unstable();
    docids
}

/// `score(d) = (1−λ)·P(d|q) + λ·Σᵢ P(iq)·P(d|iᵢ)·∏_{d' picked}(1−P(d'|iᵢ))`.
/// Greedy selection; ties broken by docid ascending.
fn xquad(input: &DiversityInput) -> Vec<(u32, f64)> {
    let baseline = truncated_scores(input.baseline, input.max_input_rankings_length);
    let intents: Vec<HashMap<u32, f64>> =
        input.intents.iter().map(|l| truncated_scores(l, input.max_input_rankings_length)).collect();
    let divisor = normalization_divisor(&baseline, &intents);
    let k = intents.len().max(1) as f64;
    let p_intent = 1.0 / k;

    let candidates = candidate_docids(&baseline);
    let mut picked: Vec<(u32, f64)> = Vec::new();
    let mut remaining: Vec<u32> = candidates;

    // Per-intent "not yet covered" factor for each candidate, starts at 1.0
    // and is multiplied down every time a document is picked.
    let mut coverage: Vec<HashMap<u32, f64>> = intents.iter().map(|_| HashMap::new()).collect();

    while picked.len() < input.max_result_ranking_length && !remaining.is_empty() {
        let mut best_idx = None;
        let mut best_score = f64::NEG_INFINITY;
        let mut best_docid = u32::MAX;

        for (idx, &d) in remaining.iter().enumerate() {
            let p_d_q = baseline.get(&d).copied().unwrap_or(0.0) / divisor;
            let mut intent_term = 0.0;
            for (i, intent) in intents.iter().enumerate() {
                let p_d_i = intent.get(&d).copied().unwrap_or(0.0) / divisor;
                let not_covered = coverage[i].get(&d).copied().unwrap_or(1.0);
                intent_term += p_intent * p_d_i * not_covered;
            }
            let score = (1.0 - input.lambda) * p_d_q + input.lambda * intent_term;

            if score > best_score || (score == best_score && d < best_docid) {
                best_score = score;
                best_docid = d;
                best_idx = Some(idx);
            }
        }

        let Some(idx) = best_idx else { break };
        let chosen = remaining.remove(idx);
        picked.push((chosen, best_score));

        for (i, intent) in intents.iter().enumerate() {
            let p_chosen_i = intent.get(&chosen).copied().unwrap_or(0.0) / divisor;
            for &d in &remaining {
                let entry = coverage[i].entry(d).or_insert(1.0);
                *entry *= 1.0 - p_chosen_i;
            }
        }
    }

    picked
}

/// PM2: maintain per-intent `v[i] = P(iq)·maxResultRankingLength`, `s[i]`;
/// pick the intent with the largest `q[i] = v[i]/(2s[i]+1)` each round, then
/// the document maximizing the mixed score, then update `s`. Finishes with
/// the strictly-decreasing 0.999 score tweak (§4.8).
fn pm2(input: &DiversityInput) -> Vec<(u32, f64)> {
    let baseline = truncated_scores(input.baseline, input.max_input_rankings_length);
    let intents: Vec<HashMap<u32, f64>> =
        input.intents.iter().map(|l| truncated_scores(l, input.max_input_rankings_length)).collect();
    let divisor = normalization_divisor(&baseline, &intents);
    let k = intents.len().max(1) as f64;
    let p_intent = 1.0 / k;

    let mut v = vec![p_intent * input.max_result_ranking_length as f64; intents.len()];
    let mut s = vec![0.0; intents.len()];

    let mut remaining: Vec<u32> = candidate_docids(&baseline);
    let mut picked: Vec<(u32, f64)> = Vec::new();

    while picked.len() < input.max_result_ranking_length && !remaining.is_empty() {
        let q: Vec<f64> = v.iter().zip(&s).map(|(&vi, &si)| vi / (2.0 * si + 1.0)).collect();
        let Some(best_intent) = argmax_index(&q) else { break };

        let mut best_idx = None;
        let mut best_score = f64::NEG_INFINITY;
        let mut best_docid = u32::MAX;

        for (idx, &d) in remaining.iter().enumerate() {
            let p_d_best = intents.get(best_intent).and_then(|m| m.get(&d)).copied().unwrap_or(0.0) / divisor;
            let mut other_term = 0.0;
            for (j, intent) in intents.iter().enumerate() {
                if j == best_intent {
                    continue;
                }
                let p_d_j = intent.get(&d).copied().unwrap_or(0.0) / divisor;
                other_term += q[j] * p_d_j;
            }
            let score = input.lambda * q[best_intent] * p_d_best + (1.0 - input.lambda) * other_term;

            if score > best_score || (score == best_score && d < best_docid) {
                best_score = score;
                best_docid = d;
                best_idx = Some(idx);
            }
        }

        let Some(idx) = best_idx else { break };
        let chosen = remaining.remove(idx);
        picked.push((chosen, best_score));

        let coverage_sum: f64 = intents.iter().map(|m| m.get(&chosen).copied().unwrap_or(0.0) / divisor).sum();
        if coverage_sum > 0.0 {
            for (j, intent) in intents.iter().enumerate() {
                let p_d_j = intent.get(&chosen).copied().unwrap_or(0.0) / divisor;
                s[j] += p_d_j / coverage_sum;
            }
        }
    }

    enforce_strictly_decreasing(&mut picked);
    picked
}

fn argmax_index(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((bi, bv)) if bv >= v => Some((bi, bv)),
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// §4.8: "if any later score is ≥ the previous picked score, multiply it by
/// 0.999" — a rank-preserving tweak so external sorters keyed on score
/// alone don't reorder PM2's output.
fn enforce_strictly_decreasing(picked: &mut [(u32, f64)]) {
    for i in 1..picked.len() {
        if picked[i].1 >= picked[i - 1].1 {
            picked[i].1 = picked[i - 1].1 * 0.999;
        }
    }
}

/// Run the configured algorithm, returning picks in result order (not
/// re-sorted; the picking order already is the desired rank order).
pub fn diversify(algorithm: DiversityAlgorithm, input: &DiversityInput) -> Vec<(u32, f64)> {
    match algorithm {
        DiversityAlgorithm::XQuAD => xquad(input),
        DiversityAlgorithm::Pm2 => pm2(input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score_list(entries: &[(u32, f64)]) -> ScoreList {
        let mut list = ScoreList::new();
        for &(d, s) in entries {
            list.push(d, s);
        }
        list
    }

    #[test]
    fn xquad_concrete_scenario_6() {
        // §8 scenario 6: baseline [a:0.5,b:0.4,c:0.3], intent1 [a:0.9,b:0.1],
        // intent2 [c:0.8,b:0.2], lambda=0.5, maxResult=2. docids a=0,b=1,c=2.
        let baseline = score_list(&[(0, 0.5), (1, 0.4), (2, 0.3)]);
        let intent1 = score_list(&[(0, 0.9), (1, 0.1)]);
        let intent2 = score_list(&[(2, 0.8), (1, 0.2)]);
        let intents = [intent1, intent2];
        let input = DiversityInput {
            baseline: &baseline,
            intents: &intents,
            lambda: 0.5,
            max_input_rankings_length: 1000,
            max_result_ranking_length: 2,
        };
        let picks = xquad(&input);
        assert_eq!(picks.len(), 2);
        assert_eq!(picks[0].0, 0); // a
        assert_eq!(picks[1].0, 2); // c, not b
    }

    #[test]
    fn diversification_output_length_is_capped() {
        let baseline = score_list(&[(0, 0.9), (1, 0.8), (2, 0.7), (3, 0.6)]);
        let intent = score_list(&[(0, 0.5), (1, 0.5), (2, 0.5), (3, 0.5)]);
        let intents = [intent];
        let input = DiversityInput {
            baseline: &baseline,
            intents: &intents,
            lambda: 0.5,
            max_input_rankings_length: 1000,
            max_result_ranking_length: 2,
        };
        let picks = diversify(DiversityAlgorithm::Pm2, &input);
        assert!(picks.len() <= 2);
    }

    #[test]
    fn pm2_output_is_strictly_decreasing() {
        let baseline = score_list(&[(0, 0.9), (1, 0.9), (2, 0.9), (3, 0.9)]);
        let intent = score_list(&[(0, 0.5), (1, 0.5), (2, 0.5), (3, 0.5)]);
        let intents = [intent];
        let input = DiversityInput {
            baseline: &baseline,
            intents: &intents,
            lambda: 0.5,
            max_input_rankings_length: 1000,
            max_result_ranking_length: 4,
        };
        let picks = pm2(&input);
        for w in picks.windows(2) {
            assert!(w[1].1 < w[0].1);
        }
    }
}
