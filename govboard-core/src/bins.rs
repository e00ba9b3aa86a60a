//! Grouping proposals into a bounded number of chart columns

use serde::{Deserialize, Serialize};

use crate::model::GovernanceProposal;

/// Vote totals for one proposal, as plotted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalVotes {
    pub proposal_id: String,
    pub title: String,
    pub yes_votes: u64,
    pub no_votes: u64,
    pub abstain_votes: u64,
}

impl ProposalVotes {
    pub fn total(&self) -> u64 {
        self.yes_votes + self.no_votes + self.abstain_votes
    }
}

impl From<&GovernanceProposal> for ProposalVotes {
    fn from(proposal: &GovernanceProposal) -> Self {
        let summary = proposal.voting_summary.clone().unwrap_or_default();
        Self {
            proposal_id: proposal.proposal_id.clone(),
            title: proposal.title(),
            yes_votes: summary.yes_votes(),
            no_votes: summary.no_votes(),
            abstain_votes: summary.abstain_votes(),
        }
    }
}

/// One chart column: a contiguous run of proposals and their summed votes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalBin {
    pub label: String,
    pub count: usize,
    pub proposal_ids: Vec<String>,
    pub yes_votes: u64,
    pub no_votes: u64,
    pub abstain_votes: u64,
}

impl ProposalBin {
    fn from_chunk(chunk: &[ProposalVotes]) -> Self {
        let label = match chunk {
            [only] => only.title.clone(),
            _ => format!("{} proposals", chunk.len()),
        };
        Self {
            label,
            count: chunk.len(),
            proposal_ids: chunk.iter().map(|p| p.proposal_id.clone()).collect(),
            yes_votes: chunk.iter().map(|p| p.yes_votes).sum(),
            no_votes: chunk.iter().map(|p| p.no_votes).sum(),
            abstain_votes: chunk.iter().map(|p| p.abstain_votes).sum(),
        }
    }

    pub fn total(&self) -> u64 {
        self.yes_votes + self.no_votes + self.abstain_votes
    }
}

/// Fold `proposals` into at most `max_columns` bins.
///
/// With room for every proposal each gets its own bin, in input order.
/// Otherwise bins hold `ceil(len / max_columns)` consecutive proposals, the
/// last one possibly fewer.
pub fn bin_proposals(proposals: &[ProposalVotes], max_columns: usize) -> Vec<ProposalBin> {
    if proposals.is_empty() || max_columns == 0 {
        return Vec::new();
    }

    let per_bin = if max_columns >= proposals.len() {
        1
    } else {
        proposals.len().div_ceil(max_columns)
    };

    proposals.chunks(per_bin).map(ProposalBin::from_chunk).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn votes(id: &str, yes: u64, no: u64, abstain: u64) -> ProposalVotes {
        ProposalVotes {
            proposal_id: id.into(),
            title: format!("Proposal {id}"),
            yes_votes: yes,
            no_votes: no,
            abstain_votes: abstain,
        }
    }

    #[test]
    fn one_bin_per_proposal_when_room() {
        let input = vec![votes("a", 1, 0, 0), votes("b", 0, 2, 0)];
        let bins = bin_proposals(&input, 5);

        assert_eq!(bins.len(), 2);
        assert_eq!(bins[0].label, "Proposal a");
        assert_eq!(bins[1].proposal_ids, vec!["b".to_string()]);
        assert_eq!(bins[1].no_votes, 2);
    }

    #[test]
    fn folds_into_contiguous_bins() {
        let input: Vec<_> = (0..7).map(|i| votes(&i.to_string(), i, 1, 0)).collect();
        let bins = bin_proposals(&input, 3);

        let counts: Vec<usize> = bins.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![3, 3, 1]);
        assert_eq!(bins[0].label, "3 proposals");
        assert_eq!(bins[0].yes_votes, 3);
        assert_eq!(bins[2].label, "Proposal 6");
    }

    #[test]
    fn empty_cases() {
        assert!(bin_proposals(&[], 4).is_empty());
        assert!(bin_proposals(&[votes("a", 1, 1, 1)], 0).is_empty());
    }

    #[test]
    fn proposal_without_summary_has_zero_votes() {
        let proposal: GovernanceProposal = serde_json::from_value(serde_json::json!({
            "proposal_id": "gov_action1xyz",
            "proposal_tx_hash": "tx",
            "proposal_index": 0,
            "proposal_type": "InfoAction",
            "proposed_epoch": 500,
            "block_time": 0,
            "meta_json": {"body": {"title": "Hard fork"}},
        }))
        .unwrap();

        let v = ProposalVotes::from(&proposal);
        assert_eq!(v.title, "Hard fork");
        assert_eq!(v.total(), 0);
    }
}
