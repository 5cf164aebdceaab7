//! Integration tests for the saga state aggregate.
//!
//! These tests walk realistic timelines through the fold and check the
//! reservation and compensation invariants against a checkpoint round-trip.

use domain::{
    Aggregate, AgentId, CompensationAction, EscalationOutcome, InvestigationOutcome, Operation,
    OperationOutput, Priority, RecordedOutcome, ResolutionMethod, SagaState, Ticket, TicketStatus,
    TimelineEvent,
};
use progress_store::{Checkpoint, Version};

fn medium_ticket() -> Ticket {
    Ticket::new("TKT-200", "Eve", "VPN drops every hour", Priority::Medium)
}

fn step(
    state: &mut SagaState,
    step: u32,
    operation: Operation,
    status: TicketStatus,
    outcome: RecordedOutcome,
) {
    state.record(
        TimelineEvent::StepStarted { step, operation },
        format!("{operation} started"),
        status,
    );
    state.record(
        TimelineEvent::StepCompleted {
            step,
            operation,
            outcome,
        },
        format!("{operation} completed"),
        status,
    );
}

mod reservation_invariant {
    use super::*;

    #[test]
    fn escalation_path_releases_each_reservation_once() {
        let mut state = SagaState::start(medium_ticket());

        step(
            &mut state,
            1,
            Operation::AssignAgent,
            TicketStatus::AssigningAgent,
            RecordedOutcome::Completed(OperationOutput::AgentAssigned(AgentId::new("agent-1"))),
        );
        step(
            &mut state,
            2,
            Operation::Investigate,
            TicketStatus::Investigating,
            RecordedOutcome::Completed(OperationOutput::Investigation(
                InvestigationOutcome::NeedsEscalation,
            )),
        );
        step(
            &mut state,
            3,
            Operation::ReleaseAgent,
            TicketStatus::ReleasingAgent,
            RecordedOutcome::Completed(OperationOutput::AgentReleased(AgentId::new("agent-1"))),
        );
        assert!(state.reserved_agent.is_none());
        assert!(state.compensations.is_empty());

        step(
            &mut state,
            4,
            Operation::EscalateToEngineering,
            TicketStatus::Escalating,
            RecordedOutcome::Completed(OperationOutput::Escalation(EscalationOutcome::Rejected)),
        );
        step(
            &mut state,
            5,
            Operation::AssignAgent,
            TicketStatus::AssigningAgent,
            RecordedOutcome::Completed(OperationOutput::AgentAssigned(AgentId::new("agent-2"))),
        );
        assert_eq!(state.reserved_agent, Some(AgentId::new("agent-2")));
        assert_eq!(state.compensations.len(), 1);

        step(
            &mut state,
            6,
            Operation::AgentResolve,
            TicketStatus::AgentResolving,
            RecordedOutcome::Rejected("agent unable to resolve".into()),
        );
        step(
            &mut state,
            7,
            Operation::ReleaseAgent,
            TicketStatus::ReleasingAgent,
            RecordedOutcome::Completed(OperationOutput::AgentReleased(AgentId::new("agent-2"))),
        );
        state.record(
            TimelineEvent::SagaFailed {
                result: "Agent unable to resolve, management notified: TKT-200".into(),
            },
            "failed",
            TicketStatus::NotifyManagement,
        );

        assert!(state.is_terminal());
        assert!(state.reserved_agent.is_none());
        assert!(state.compensations.is_empty());
        assert_eq!(state.escalation_count, 1);
    }

    #[test]
    fn consumption_retires_reservation() {
        let mut state = SagaState::start(medium_ticket());
        step(
            &mut state,
            1,
            Operation::AssignAgent,
            TicketStatus::AssigningAgent,
            RecordedOutcome::Completed(OperationOutput::AgentAssigned(AgentId::new("agent-3"))),
        );
        state.record(
            TimelineEvent::ReservationConsumed {
                agent_id: AgentId::new("agent-3"),
            },
            "consumed",
            TicketStatus::Notifying,
        );
        state.record(
            TimelineEvent::SagaResolved {
                method: ResolutionMethod::Agent,
                result: "Resolved normally: TKT-200".into(),
            },
            "resolved",
            TicketStatus::Notifying,
        );

        assert_eq!(state.status, TicketStatus::Resolved);
        assert!(state.reserved_agent.is_none());
        assert!(state.compensations.is_empty());
    }

    #[test]
    fn failed_compensation_still_retires_entry() {
        let mut state = SagaState::start(medium_ticket());
        step(
            &mut state,
            1,
            Operation::AssignAgent,
            TicketStatus::AssigningAgent,
            RecordedOutcome::Completed(OperationOutput::AgentAssigned(AgentId::new("agent-5"))),
        );
        state.record(
            TimelineEvent::CompensationFailed {
                action: CompensationAction::ReleaseAgent {
                    agent_id: AgentId::new("agent-5"),
                },
                error: "agent directory offline".into(),
            },
            "failed",
            TicketStatus::Compensating,
        );
        assert!(state.compensations.is_empty());
        assert!(state.reserved_agent.is_none());
    }
}

mod checkpointing {
    use super::*;

    #[test]
    fn state_survives_checkpoint_roundtrip() {
        let mut state = SagaState::start(medium_ticket());
        step(
            &mut state,
            1,
            Operation::AssignAgent,
            TicketStatus::AssigningAgent,
            RecordedOutcome::Completed(OperationOutput::AgentAssigned(AgentId::new("agent-1"))),
        );
        state.set_version(Version::new(3));

        let checkpoint = Checkpoint::from_state(
            state.id().clone(),
            state.run_id,
            state.version(),
            state.status.as_str(),
            state.is_terminal(),
            &state,
        )
        .unwrap();
        assert_eq!(checkpoint.status, "ASSIGNING_AGENT");

        let restored: SagaState = checkpoint.into_state().unwrap();
        assert_eq!(restored, state);
        assert_eq!(restored.completed_outcome(1).unwrap().0, Operation::AssignAgent);
    }

    #[test]
    fn replayed_timeline_matches_recorded_state() {
        let mut state = SagaState::start(medium_ticket());
        step(
            &mut state,
            1,
            Operation::AssignAgent,
            TicketStatus::AssigningAgent,
            RecordedOutcome::Completed(OperationOutput::AgentAssigned(AgentId::new("agent-1"))),
        );
        step(
            &mut state,
            2,
            Operation::Investigate,
            TicketStatus::Investigating,
            RecordedOutcome::Completed(OperationOutput::Investigation(
                InvestigationOutcome::Complete,
            )),
        );

        let replayed = SagaState::replay(medium_ticket(), state.timeline.clone());
        assert_eq!(replayed.reserved_agent, state.reserved_agent);
        assert_eq!(replayed.compensations, state.compensations);
        assert_eq!(replayed.status, TicketStatus::Investigating);
        assert_eq!(replayed.steps_completed(), state.steps_completed());
    }
}
