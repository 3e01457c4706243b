// Shared test fixtures
#![allow(dead_code)]

use std::collections::BTreeMap;

use chrono::Utc;
use magi_gui::models::{
    ConsensusResult, DebateOutput, DebateRound, Decision, Persona, ThinkingOutput, Vote,
    VoteOutput,
};

pub fn thinking_all() -> BTreeMap<Persona, ThinkingOutput> {
    let now = Utc::now();
    Persona::ALL
        .into_iter()
        .map(|persona| {
            (
                persona,
                ThinkingOutput {
                    persona,
                    content: format!("{} analysis of the proposal.", persona.label()),
                    timestamp: now,
                },
            )
        })
        .collect()
}

pub fn debate_round(round_number: u32) -> DebateRound {
    let now = Utc::now();
    let outputs = Persona::ALL
        .into_iter()
        .map(|persona| {
            let responses: BTreeMap<Persona, String> = Persona::ALL
                .into_iter()
                .filter(|target| *target != persona)
                .map(|target| {
                    (
                        target,
                        format!("Response to {} from {}.", target.label(), persona.label()),
                    )
                })
                .collect();
            (
                persona,
                DebateOutput {
                    persona,
                    round_number,
                    responses,
                    timestamp: now,
                },
            )
        })
        .collect();

    DebateRound {
        round_number,
        outputs,
        timestamp: now,
    }
}

pub fn voting_all() -> BTreeMap<Persona, VoteOutput> {
    let mut voting = BTreeMap::new();
    voting.insert(
        Persona::Melchior,
        VoteOutput {
            persona: Persona::Melchior,
            vote: Vote::Approve,
            reason: "Scientific analysis supports approval.".to_string(),
            conditions: None,
        },
    );
    voting.insert(
        Persona::Balthasar,
        VoteOutput {
            persona: Persona::Balthasar,
            vote: Vote::Conditional,
            reason: "Approval with safety conditions.".to_string(),
            conditions: Some(vec![
                "Implement safety measures".to_string(),
                "Monitor outcomes".to_string(),
            ]),
        },
    );
    voting.insert(
        Persona::Casper,
        VoteOutput {
            persona: Persona::Casper,
            vote: Vote::Approve,
            reason: "Intuitive assessment favors approval.".to_string(),
            conditions: None,
        },
    );
    voting
}

/// A complete run: approved, with Balthasar's two conditions merged.
pub fn consensus_result() -> ConsensusResult {
    ConsensusResult {
        thinking_results: thinking_all(),
        debate_results: vec![debate_round(1)],
        voting_results: voting_all(),
        final_decision: Decision::Approved,
        all_conditions: vec![
            "Implement safety measures".to_string(),
            "Monitor outcomes".to_string(),
        ],
        exit_code: 0,
    }
}

/// Unanimous approval with no conditions anywhere.
pub fn approved_unanimous() -> ConsensusResult {
    let voting = Persona::ALL
        .into_iter()
        .map(|persona| {
            (
                persona,
                VoteOutput {
                    persona,
                    vote: Vote::Approve,
                    reason: "Approve.".to_string(),
                    conditions: None,
                },
            )
        })
        .collect();

    ConsensusResult {
        thinking_results: thinking_all(),
        debate_results: vec![debate_round(1)],
        voting_results: voting,
        final_decision: Decision::Approved,
        all_conditions: Vec::new(),
        exit_code: 0,
    }
}
