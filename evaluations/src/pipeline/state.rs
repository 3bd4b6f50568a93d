use state_machines::state_machine;

state_machine! {
    name: EvaluationMachine,
    state: EvaluationState,
    initial: Ready,
    states: [Ready, CorpusLoaded, QueriesFinished, Summarized],
    events {
        load_corpus { transition: { from: Ready, to: CorpusLoaded } }
        run_queries { transition: { from: CorpusLoaded, to: QueriesFinished } }
        summarize { transition: { from: QueriesFinished, to: Summarized } }
    }
}

pub fn ready() -> EvaluationMachine<(), Ready> {
    EvaluationMachine::new(())
}
