//! Integration tests for the ticket saga engine.

use std::time::Duration;

use common::{AgentId, TicketId};
use domain::{
    Aggregate, EscalationOutcome, FixOutcome, InvestigationOutcome, Operation, OperationOutput,
    Priority, RecordedOutcome, ResolutionMethod, SagaState, Ticket, TicketStatus, TimelineEvent,
};
use progress_store::{Checkpoint, InMemoryProgressStore, ProgressStore, ProgressStoreError};
use saga::{
    ExecutorConfig, InMemoryEngineeringService, InMemoryEscalationService,
    InMemorySupportService, OperationError, OperationGates, OperationJournal, RetryPolicy,
    SagaError, ServiceHooks, TicketSagaEngine,
};

type TestEngine = TicketSagaEngine<
    InMemoryProgressStore,
    InMemorySupportService,
    InMemoryEscalationService,
    InMemoryEngineeringService,
>;

struct TestHarness {
    engine: TestEngine,
    store: InMemoryProgressStore,
    journal: OperationJournal,
    gates: OperationGates,
    support: InMemorySupportService,
    escalation: InMemoryEscalationService,
    engineering: InMemoryEngineeringService,
}

fn fast_config() -> ExecutorConfig {
    ExecutorConfig::default().with_retry(RetryPolicy::new(
        3,
        Duration::from_millis(1),
        Duration::from_millis(4),
        2.0,
    ))
}

impl TestHarness {
    fn new() -> Self {
        Self::with_store(InMemoryProgressStore::new(), OperationJournal::new())
    }

    /// A harness over an existing store and journal, as after a restart.
    fn with_store(store: InMemoryProgressStore, journal: OperationJournal) -> Self {
        let gates = OperationGates::new();
        let hooks = ServiceHooks::new(journal.clone(), gates.clone());
        let support = InMemorySupportService::with_hooks(hooks.clone());
        let escalation = InMemoryEscalationService::with_hooks(hooks.clone());
        let engineering = InMemoryEngineeringService::with_hooks(hooks);

        let engine = TicketSagaEngine::with_config(
            store.clone(),
            support.clone(),
            escalation.clone(),
            engineering.clone(),
            fast_config(),
        );

        Self {
            engine,
            store,
            journal,
            gates,
            support,
            escalation,
            engineering,
        }
    }

    fn restart(&self) -> Self {
        Self::with_store(self.store.clone(), self.journal.clone())
    }

    async fn persisted(&self, id: &str) -> SagaState {
        self.store
            .load(&TicketId::new(id))
            .await
            .unwrap()
            .expect("checkpoint exists")
            .into_state()
            .unwrap()
    }

    async fn wait_for_invocation(&self, operation: Operation) {
        for _ in 0..500 {
            if self.journal.count(operation) > 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("{operation} was never invoked");
    }

    async fn wait_until_parked(&self, id: &str) {
        for _ in 0..500 {
            if let Some(checkpoint) = self.store.load(&TicketId::new(id)).await.unwrap() {
                let state: SagaState = checkpoint.into_state().unwrap();
                if state.paused {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("saga {id} never parked");
    }
}

fn ticket(id: &str, priority: Priority) -> Ticket {
    Ticket::new(id, "Morgan Lee", "Cannot log in", priority)
}

fn assert_reservations_retired(state: &SagaState) {
    assert!(state.compensations.is_empty(), "stack: {:?}", state.compensations);
    assert!(state.reserved_agent.is_none());

    let assigned = state
        .timeline
        .iter()
        .filter(|e| {
            matches!(
                e.event,
                TimelineEvent::StepCompleted {
                    outcome: RecordedOutcome::Completed(OperationOutput::AgentAssigned(_)),
                    ..
                }
            )
        })
        .count();
    let retired = state
        .timeline
        .iter()
        .filter(|e| {
            matches!(
                e.event,
                TimelineEvent::StepCompleted {
                    outcome: RecordedOutcome::Completed(OperationOutput::AgentReleased(_)),
                    ..
                } | TimelineEvent::ReservationConsumed { .. }
                    | TimelineEvent::CompensationExecuted { .. }
                    | TimelineEvent::CompensationFailed { .. }
            )
        })
        .count();
    assert_eq!(assigned, retired);
}

#[tokio::test]
async fn test_low_priority_kb_miss_resolved_by_agent() {
    let h = TestHarness::new();
    h.support
        .script_knowledge_base(Err(OperationError::non_retryable("no solution found")));

    let result = h
        .engine
        .execute(ticket("TKT-S1", Priority::Low))
        .await
        .unwrap();

    assert_eq!(result.message, "Resolved by agent: TKT-S1");
    assert_eq!(result.status, TicketStatus::Resolved);
    assert_eq!(result.resolution_method, Some(ResolutionMethod::Agent));
    assert_eq!(
        h.journal.operations_for(&TicketId::new("TKT-S1")),
        vec![
            Operation::SendAutoResponse,
            Operation::SearchKnowledgeBase,
            Operation::AssignAgent,
            Operation::AgentResolve,
            Operation::NotifyCustomer,
        ]
    );

    let state = h.persisted("TKT-S1").await;
    assert_reservations_retired(&state);
    assert_eq!(state.snapshot().step_count, 5);
}

#[tokio::test]
async fn test_low_priority_validation_failure_falls_back_to_agent() {
    let h = TestHarness::new();
    h.engineering
        .script_validate(Err(OperationError::non_retryable("customer reports unresolved")));

    let result = h
        .engine
        .execute(ticket("TKT-S2", Priority::Low))
        .await
        .unwrap();

    assert_eq!(result.message, "Resolved by agent: TKT-S2");
    assert_ne!(result.resolution_method, Some(ResolutionMethod::Automated));
    assert_eq!(
        h.journal.operations_for(&TicketId::new("TKT-S2")),
        vec![
            Operation::SendAutoResponse,
            Operation::SearchKnowledgeBase,
            Operation::NotifyCustomer,
            Operation::ValidateResolution,
            Operation::NotifyCustomer,
            Operation::AssignAgent,
            Operation::AgentResolve,
            Operation::NotifyCustomer,
        ]
    );
}

#[tokio::test]
async fn test_medium_priority_rejected_escalation_and_failed_reassignment() {
    let h = TestHarness::new();
    h.escalation
        .script_investigate(Ok(InvestigationOutcome::NeedsEscalation));
    h.escalation.script_escalate(Ok(EscalationOutcome::Rejected));
    h.support
        .script_agent_resolve(Err(OperationError::non_retryable("unable to reproduce")));

    let result = h
        .engine
        .execute(ticket("TKT-S3", Priority::Medium))
        .await
        .unwrap();

    assert_eq!(
        result.message,
        "Agent unable to resolve, management notified: TKT-S3"
    );
    assert_eq!(result.status, TicketStatus::Failed);
    assert_eq!(
        h.journal.released_agents(),
        vec![AgentId::new("agent-1"), AgentId::new("agent-2")]
    );
    assert_eq!(
        h.journal.operations_for(&TicketId::new("TKT-S3")),
        vec![
            Operation::AssignAgent,
            Operation::Investigate,
            Operation::ReleaseAgent,
            Operation::EscalateToEngineering,
            Operation::AssignAgent,
            Operation::AgentResolve,
            Operation::ReleaseAgent,
            Operation::NotifyManagement,
        ]
    );

    let state = h.persisted("TKT-S3").await;
    assert_reservations_retired(&state);
    assert_eq!(state.escalation_count, 1);
    // Designed failure branch: nothing left to unwind
    assert!(
        !state
            .timeline
            .iter()
            .any(|e| matches!(e.event, TimelineEvent::UnwindStarted { .. }))
    );
}

#[tokio::test]
async fn test_high_priority_fix_failure_notifies_management_only() {
    let h = TestHarness::new();
    h.engineering.script_apply_fix(Ok(FixOutcome::Failed));

    let result = h
        .engine
        .execute(ticket("TKT-S4", Priority::High))
        .await
        .unwrap();

    assert_eq!(result.message, "Failed to resolve urgent issue: TKT-S4");
    let operations = h.journal.operations_for(&TicketId::new("TKT-S4"));
    assert_eq!(
        operations,
        vec![
            Operation::AssignAgent,
            Operation::EscalateToEngineering,
            Operation::ApplyUrgentFix,
            Operation::ReleaseAgent,
            Operation::NotifyManagement,
        ]
    );
    assert!(!operations.contains(&Operation::NotifyCustomer));
    assert_eq!(h.journal.released_agents(), vec![AgentId::new("senior-1")]);
}

#[tokio::test]
async fn test_pause_between_escalation_and_fix() {
    let h = TestHarness::new();
    let id = TicketId::new("TKT-S5");
    h.gates.close(Operation::EscalateToEngineering);

    let handle = h
        .engine
        .spawn(ticket("TKT-S5", Priority::High))
        .await
        .unwrap();

    h.wait_for_invocation(Operation::EscalateToEngineering).await;
    h.engine.control().pause(&id).unwrap();
    assert!(h.engine.control().status(&id).unwrap().paused);
    h.gates.open(Operation::EscalateToEngineering);

    h.wait_until_parked("TKT-S5").await;
    let pause = Duration::from_millis(150);
    tokio::time::sleep(pause).await;
    assert_eq!(h.journal.count(Operation::ApplyUrgentFix), 0);
    assert_eq!(
        h.engine.control().status(&id).unwrap().current_status,
        TicketStatus::Escalating
    );

    h.engine.control().resume(&id).unwrap();
    let result = handle.await.unwrap().unwrap();
    assert_eq!(result.message, "Resolved urgently: TKT-S5");

    let timeline = h.persisted("TKT-S5").await.timeline;
    let escalated = timeline
        .iter()
        .position(|e| {
            matches!(
                e.event,
                TimelineEvent::StepCompleted {
                    operation: Operation::EscalateToEngineering,
                    ..
                }
            )
        })
        .unwrap();
    let next = &timeline[escalated + 1];
    assert!(matches!(
        next.event,
        TimelineEvent::StepStarted {
            operation: Operation::ApplyUrgentFix,
            ..
        }
    ));
    assert_eq!(next.status, TicketStatus::ApplyingFix);

    let gap = next.timestamp - timeline[escalated].timestamp;
    assert!(gap >= chrono::Duration::from_std(pause).unwrap(), "gap {gap}");

    let escalations_started = timeline
        .iter()
        .filter(|e| {
            matches!(
                e.event,
                TimelineEvent::StepStarted {
                    operation: Operation::EscalateToEngineering,
                    ..
                }
            )
        })
        .count();
    assert_eq!(escalations_started, 1);
    assert_eq!(h.journal.count(Operation::EscalateToEngineering), 1);
}

#[tokio::test]
async fn test_resume_after_crash_skips_completed_operations() {
    let h = TestHarness::new();
    h.escalation
        .script_investigate(Ok(InvestigationOutcome::NeedsEscalation));
    h.gates.close(Operation::NotifyCustomer);

    let handle = h
        .engine
        .spawn(ticket("TKT-R1", Priority::Medium))
        .await
        .unwrap();
    h.wait_for_invocation(Operation::NotifyCustomer).await;

    // Crash: the task dies with the notification outstanding
    handle.abort();
    assert!(handle.await.unwrap_err().is_cancelled());

    let restarted = h.restart();
    let result = restarted
        .engine
        .execute(ticket("TKT-R1", Priority::Medium))
        .await
        .unwrap();

    assert_eq!(result.message, "Resolved with escalation: TKT-R1");
    assert_eq!(result.status, TicketStatus::ResolvedWithEscalation);
    assert_eq!(h.journal.count(Operation::AssignAgent), 1);
    assert_eq!(h.journal.count(Operation::Investigate), 1);
    assert_eq!(h.journal.count(Operation::ReleaseAgent), 1);
    assert_eq!(h.journal.count(Operation::EscalateToEngineering), 1);
    // Only the in-flight step runs again
    assert_eq!(h.journal.count(Operation::NotifyCustomer), 2);

    // A second resume of the archived ticket returns the same result
    let invocations = h.journal.invocations().len();
    let again = restarted
        .engine
        .execute(ticket("TKT-R1", Priority::Medium))
        .await
        .unwrap();
    assert_eq!(again, result);
    assert_eq!(h.journal.invocations().len(), invocations);
    assert_reservations_retired(&restarted.persisted("TKT-R1").await);
}

#[tokio::test]
async fn test_interrupted_unwind_finishes_without_rerunning_plan() {
    let h = TestHarness::new();
    let id = TicketId::new("TKT-U1");

    let mut state = SagaState::start(ticket("TKT-U1", Priority::High));
    state.record(
        TimelineEvent::StepStarted {
            step: 1,
            operation: Operation::AssignAgent,
        },
        "Starting assign_agent",
        TicketStatus::AssignSenior,
    );
    state.record(
        TimelineEvent::StepCompleted {
            step: 1,
            operation: Operation::AssignAgent,
            outcome: RecordedOutcome::Completed(OperationOutput::AgentAssigned(AgentId::new(
                "senior-9",
            ))),
        },
        "agent senior-9 assigned",
        TicketStatus::AssignSenior,
    );
    state.record(
        TimelineEvent::UnwindStarted {
            reason: "engineering unreachable".into(),
            result: "Failed: TKT-U1 - engineering unreachable".into(),
        },
        "Compensating",
        TicketStatus::Compensating,
    );
    let version = state.version().next();
    state.set_version(version);
    let checkpoint = Checkpoint::from_state(
        id.clone(),
        state.run_id,
        version,
        state.status.as_str(),
        false,
        &state,
    )
    .unwrap();
    h.store.restore(checkpoint).await;

    let result = h
        .engine
        .execute(ticket("TKT-U1", Priority::High))
        .await
        .unwrap();

    assert_eq!(result.status, TicketStatus::Failed);
    assert_eq!(result.message, "Failed: TKT-U1 - engineering unreachable");
    assert_eq!(h.journal.operations_for(&id), vec![Operation::ReleaseAgent]);
    assert_eq!(h.journal.released_agents(), vec![AgentId::new("senior-9")]);
    assert_reservations_retired(&h.persisted("TKT-U1").await);
}

#[tokio::test]
async fn test_same_outcomes_take_the_same_path() {
    async fn run_once() -> (Vec<Operation>, Vec<&'static str>) {
        let h = TestHarness::new();
        h.escalation
            .script_investigate(Ok(InvestigationOutcome::NeedsEscalation));
        h.escalation.script_escalate(Ok(EscalationOutcome::Rejected));
        h.engine
            .execute(ticket("TKT-D1", Priority::Medium))
            .await
            .unwrap();

        let events = h
            .persisted("TKT-D1")
            .await
            .timeline
            .iter()
            .map(|e| e.event.event_type())
            .collect();
        (h.journal.operations_for(&TicketId::new("TKT-D1")), events)
    }

    let first = run_once().await;
    let second = run_once().await;
    assert_eq!(first, second);
    assert!(first.1.contains(&"ReservationConsumed"));
}

#[tokio::test]
async fn test_abort_unwinds_held_reservation() {
    let h = TestHarness::new();
    let id = TicketId::new("TKT-A1");
    h.gates.close(Operation::Investigate);

    let handle = h
        .engine
        .spawn(ticket("TKT-A1", Priority::Medium))
        .await
        .unwrap();
    h.wait_for_invocation(Operation::Investigate).await;
    h.engine.control().abort(&id).unwrap();

    let result = handle.await.unwrap().unwrap();
    h.gates.open(Operation::Investigate);

    assert_eq!(result.status, TicketStatus::Failed);
    assert_eq!(
        result.message,
        "Failed: TKT-A1 - saga for ticket TKT-A1 aborted"
    );
    assert_eq!(h.journal.released_agents(), vec![AgentId::new("agent-1")]);

    let state = h.persisted("TKT-A1").await;
    assert_reservations_retired(&state);
    let types: Vec<_> = state
        .timeline
        .iter()
        .rev()
        .take(3)
        .map(|e| e.event.event_type())
        .collect();
    assert_eq!(
        types,
        vec!["SagaFailed", "CompensationExecuted", "UnwindStarted"]
    );
}

#[tokio::test]
async fn test_abort_while_paused_before_first_step() {
    let h = TestHarness::new();
    let id = TicketId::new("TKT-A2");

    let handle = h
        .engine
        .spawn(ticket("TKT-A2", Priority::Low))
        .await
        .unwrap();
    h.engine.control().pause(&id).unwrap();
    h.wait_until_parked("TKT-A2").await;

    h.engine.control().abort(&id).unwrap();
    let result = handle.await.unwrap().unwrap();

    assert_eq!(result.status, TicketStatus::Failed);
    assert!(h.journal.operations_for(&id).is_empty());
    assert!(!h.persisted("TKT-A2").await.paused);
}

#[tokio::test]
async fn test_retries_exhausted_compensates_and_fails() {
    let h = TestHarness::new();
    for _ in 0..3 {
        h.engineering
            .script_apply_fix(Err(OperationError::retryable("deploy pipeline timeout")));
    }

    let result = h
        .engine
        .execute(ticket("TKT-X1", Priority::High))
        .await
        .unwrap();

    assert_eq!(result.status, TicketStatus::Failed);
    assert_eq!(
        result.message,
        "Failed: TKT-X1 - operation 'apply_urgent_fix' failed after 3 attempts: deploy pipeline timeout"
    );
    assert_eq!(h.journal.count(Operation::ApplyUrgentFix), 3);
    assert_eq!(h.journal.released_agents(), vec![AgentId::new("senior-1")]);

    let state = h.persisted("TKT-X1").await;
    let failed_attempts = state
        .timeline
        .iter()
        .filter(|e| matches!(e.event, TimelineEvent::AttemptFailed { .. }))
        .count();
    assert_eq!(failed_attempts, 3);
    assert_reservations_retired(&state);
}

#[tokio::test]
async fn test_failed_release_is_recorded_and_plan_continues() {
    let h = TestHarness::new();
    h.engineering.script_apply_fix(Ok(FixOutcome::Failed));
    h.support
        .script_release_agent(Err(OperationError::non_retryable("agent record locked")));

    let result = h
        .engine
        .execute(ticket("TKT-X2", Priority::High))
        .await
        .unwrap();

    assert_eq!(result.message, "Failed to resolve urgent issue: TKT-X2");
    let state = h.persisted("TKT-X2").await;
    assert!(
        state
            .timeline
            .iter()
            .any(|e| matches!(e.event, TimelineEvent::CompensationFailed { .. }))
    );
    assert_reservations_retired(&state);
}

#[tokio::test]
async fn test_running_ticket_cannot_start_twice() {
    let h = TestHarness::new();
    h.gates.close(Operation::SendAutoResponse);

    let handle = h
        .engine
        .spawn(ticket("TKT-C1", Priority::Low))
        .await
        .unwrap();

    let err = h
        .engine
        .execute(ticket("TKT-C1", Priority::Low))
        .await
        .unwrap_err();
    assert!(matches!(err, SagaError::AlreadyRunning(_)));

    h.gates.open(Operation::SendAutoResponse);
    let result = handle.await.unwrap().unwrap();
    assert_eq!(result.message, "Resolved automatically: TKT-C1");

    let err = h
        .engine
        .spawn(ticket("TKT-C1", Priority::Low))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SagaError::Store(ProgressStoreError::Archived(_))
    ));
}

#[tokio::test]
async fn test_pause_survives_restart() {
    let h = TestHarness::new();
    let id = TicketId::new("TKT-P1");

    let handle = h
        .engine
        .spawn(ticket("TKT-P1", Priority::High))
        .await
        .unwrap();
    h.engine.control().pause(&id).unwrap();
    h.wait_until_parked("TKT-P1").await;
    handle.abort();
    let _ = handle.await;

    let restarted = h.restart();
    let handles = restarted.engine.recover_incomplete().await.unwrap();
    assert_eq!(handles.len(), 1);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(restarted.engine.control().status(&id).unwrap().paused);
    assert!(h.journal.operations_for(&id).is_empty());

    restarted.engine.control().resume(&id).unwrap();
    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.message, "Resolved urgently: TKT-P1");
    }
}

#[tokio::test]
async fn test_status_snapshot_reports_progress() {
    let h = TestHarness::new();
    let id = TicketId::new("TKT-Q1");
    h.gates.close(Operation::Investigate);

    let handle = h
        .engine
        .spawn(ticket("TKT-Q1", Priority::Medium))
        .await
        .unwrap();
    h.wait_for_invocation(Operation::Investigate).await;

    let snapshot = h.engine.control().status(&id).unwrap();
    assert_eq!(snapshot.priority, Priority::Medium);
    assert_eq!(snapshot.current_status, TicketStatus::Investigating);
    assert_eq!(snapshot.current_step, "INVESTIGATING (investigate)");
    assert_eq!(snapshot.assigned_agent, Some(AgentId::new("agent-1")));
    assert_eq!(snapshot.step_count, 1);
    assert!(!snapshot.paused);

    h.gates.open(Operation::Investigate);
    handle.await.unwrap().unwrap();

    let snapshot = h.engine.load_snapshot(&id).await.unwrap();
    assert!(snapshot.is_terminal());
    assert!(snapshot.assigned_agent.is_none());
}

#[tokio::test]
async fn test_finished_sagas_leave_control_surface() {
    let h = TestHarness::new();

    let mut handles = Vec::new();
    for n in 0..20 {
        let handle = h
            .engine
            .spawn(ticket(&format!("TKT-R{n}"), Priority::Low))
            .await
            .unwrap();
        handles.push(handle);
    }
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().is_resolved());
    }

    assert!(h.engine.control().list().is_empty());
    let id = TicketId::new("TKT-R7");
    assert!(!h.engine.control().is_running(&id));
    assert!(matches!(
        h.engine.control().status(&id),
        Err(SagaError::UnknownTicket(_))
    ));

    let snapshot = h.engine.load_snapshot(&id).await.unwrap();
    assert_eq!(snapshot.current_status, TicketStatus::Resolved);
    assert_eq!(snapshot.result.as_deref(), Some("Resolved automatically: TKT-R7"));
}

/// Runs a ticket whose first agent assignment finds nobody available.
async fn run_without_agents(h: &TestHarness, id: &str, priority: Priority) -> saga::SagaResult {
    h.escalation
        .script_assign_agent(Err(OperationError::unavailable("no agent available")));
    h.engine.execute(ticket(id, priority)).await.unwrap()
}

#[tokio::test]
async fn test_low_priority_no_agent_goes_to_backlog() {
    let h = TestHarness::new();
    h.support
        .script_knowledge_base(Err(OperationError::non_retryable("no solution found")));

    let result = run_without_agents(&h, "TKT-U1", Priority::Low).await;

    assert_eq!(
        result.message,
        "No agent available, ticket queued for manual handling: TKT-U1"
    );
    assert_eq!(result.status, TicketStatus::Failed);
    assert_eq!(
        h.journal.operations_for(&TicketId::new("TKT-U1")),
        vec![
            Operation::SendAutoResponse,
            Operation::SearchKnowledgeBase,
            Operation::AssignAgent,
            Operation::NotifyManagement,
        ]
    );
    assert_reservations_retired(&h.persisted("TKT-U1").await);
}

#[tokio::test]
async fn test_medium_priority_no_agent_goes_to_backlog() {
    let h = TestHarness::new();

    let result = run_without_agents(&h, "TKT-U2", Priority::Medium).await;

    assert_eq!(
        result.message,
        "No agent available, ticket queued for manual handling: TKT-U2"
    );
    assert_eq!(result.status, TicketStatus::Failed);
    assert_eq!(
        h.journal.operations_for(&TicketId::new("TKT-U2")),
        vec![Operation::AssignAgent, Operation::NotifyManagement]
    );
    assert_reservations_retired(&h.persisted("TKT-U2").await);
}

#[tokio::test]
async fn test_high_priority_no_senior_goes_to_backlog() {
    let h = TestHarness::new();

    let result = run_without_agents(&h, "TKT-U3", Priority::High).await;

    assert_eq!(
        result.message,
        "No senior agent available, ticket queued for manual handling: TKT-U3"
    );
    assert_eq!(result.status, TicketStatus::Failed);
    assert_eq!(
        h.journal.operations_for(&TicketId::new("TKT-U3")),
        vec![Operation::AssignAgent, Operation::NotifyManagement]
    );
    assert_reservations_retired(&h.persisted("TKT-U3").await);
}

#[tokio::test]
async fn test_medium_priority_unavailable_investigator_escalates() {
    let h = TestHarness::new();
    h.escalation
        .script_investigate(Err(OperationError::unavailable("agent went offline")));

    let result = h
        .engine
        .execute(ticket("TKT-U4", Priority::Medium))
        .await
        .unwrap();

    assert_eq!(result.message, "Resolved with escalation: TKT-U4");
    assert_eq!(result.resolution_method, Some(ResolutionMethod::Escalation));
    assert_eq!(
        h.journal.operations_for(&TicketId::new("TKT-U4")),
        vec![
            Operation::AssignAgent,
            Operation::Investigate,
            Operation::ReleaseAgent,
            Operation::EscalateToEngineering,
            Operation::NotifyCustomer,
        ]
    );
    assert_eq!(h.journal.released_agents(), vec![AgentId::new("agent-1")]);
    assert_reservations_retired(&h.persisted("TKT-U4").await);
}

#[tokio::test]
async fn test_low_priority_agent_failure_notifies_management() {
    let h = TestHarness::new();
    h.support
        .script_knowledge_base(Err(OperationError::non_retryable("no solution found")));
    h.support
        .script_agent_resolve(Err(OperationError::non_retryable("unable to reproduce")));

    let result = h
        .engine
        .execute(ticket("TKT-U5", Priority::Low))
        .await
        .unwrap();

    assert_eq!(
        result.message,
        "Agent unable to resolve, management notified: TKT-U5"
    );
    assert_eq!(result.status, TicketStatus::Failed);
    assert_eq!(
        h.journal.operations_for(&TicketId::new("TKT-U5")),
        vec![
            Operation::SendAutoResponse,
            Operation::SearchKnowledgeBase,
            Operation::AssignAgent,
            Operation::AgentResolve,
            Operation::ReleaseAgent,
            Operation::NotifyManagement,
        ]
    );
    assert_eq!(h.journal.released_agents(), vec![AgentId::new("agent-1")]);
    assert_reservations_retired(&h.persisted("TKT-U5").await);
}
