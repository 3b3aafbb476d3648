mod common;

use blockrun::{
  call_legacy_block,
  compat::{StartedBranch, UtilityError},
  timer::Timer,
  BlockUtility, CompatBlockUtility, ExecutionContext, Status, Value,
};
use common::{init_logger, Fixture};
use pretty_assertions::assert_eq;
use rstest::rstest;

/// A legacy "wait" block: starts a timer on its frame the first time and
/// yields until it has one.
fn legacy_wait(util: &mut dyn BlockUtility) -> Option<Value> {
  if util.stack_frame().timer.is_none() {
    util.stack_frame().timer = Some(Timer::start());
    util
      .stack_frame()
      .values
      .insert("duration".to_string(), Value::Number(1.));
    util.yield_thread();
  }
  None
}

#[test]
fn the_bound_frame_is_what_legacy_blocks_see() {
  init_logger();
  let fixture = Fixture::new();
  let mut thread = fixture.thread("hat");
  thread.push_stack("hat");

  let (result, branch) = call_legacy_block(
    &mut thread,
    "fake",
    ExecutionContext::default(),
    legacy_wait,
  );

  assert_eq!(result, None);
  assert_eq!(branch, None);
  assert_eq!(thread.status, Status::Yield);
  assert_eq!(thread.peek_stack(), Some("fake"));
  assert_eq!(thread.stack().len(), thread.stack_frames().len());
  let frame = thread.compatibility_stack_frame.as_ref().unwrap();
  assert!(frame.timer.is_some());
  assert_eq!(frame.values.get("duration"), Some(&Value::Number(1.)));
}

#[test]
fn the_caller_keeps_its_frame_between_calls() {
  let fixture = Fixture::new();
  let mut thread = fixture.thread("hat");
  thread.push_stack("hat");
  let context = ExecutionContext::default();
  call_legacy_block(&mut thread, "fake", context, legacy_wait);

  thread.status = Status::Running;
  let frame = thread.compatibility_stack_frame.take().unwrap();
  call_legacy_block(&mut thread, "fake", frame, legacy_wait);
  assert_eq!(thread.status, Status::Running);
}

#[test]
fn binding_an_empty_stack_pushes_the_placeholder() {
  let fixture = Fixture::new();
  let mut thread = fixture.thread("hat");
  CompatBlockUtility::init(&mut thread, "fake", ExecutionContext::default());
  assert_eq!(thread.peek_stack(), Some("fake"));
  assert_eq!(thread.stack_frames().len(), 1);
}

#[test]
fn started_branches_are_reported_back() {
  let fixture = Fixture::new();
  let mut thread = fixture.thread("hat");
  thread.push_stack("hat");
  let (_, branch) = call_legacy_block(
    &mut thread,
    "fake",
    ExecutionContext::default(),
    |util| util.start_branch(2, true),
  );
  assert_eq!(
    branch,
    Some(StartedBranch {
      branch_number: 2,
      is_loop: true
    })
  );

  let util =
    CompatBlockUtility::init(&mut thread, "fake", ExecutionContext::default());
  assert_eq!(util.started_branch(), None);
}

#[rstest]
#[case("startProcedure")]
#[case("initParams")]
#[case("pushParam")]
#[case("getParam")]
fn procedure_entry_points_are_refused(#[case] entry_point: &str) {
  let fixture = Fixture::new();
  let mut thread = fixture.thread("hat");
  thread.push_stack("hat");
  let mut util =
    CompatBlockUtility::init(&mut thread, "fake", ExecutionContext::default());

  let error = match entry_point {
    "startProcedure" => util.start_procedure("greet %s").unwrap_err(),
    "initParams" => util.init_params().unwrap_err(),
    "pushParam" => util.push_param("x", Value::Null).unwrap_err(),
    _ => util.get_param("x").unwrap_err(),
  };
  assert_eq!(
    error.to_string(),
    format!("{entry_point} is not supported by this BlockUtility")
  );
  assert!(matches!(error, UtilityError::Unsupported(_)));
  // The thread itself is untouched.
  assert!(util.thread().get_all_params().is_none());
}

#[test]
fn legacy_blocks_reach_the_sequencer() {
  let fixture = Fixture::new();
  let mut thread = fixture.thread("hat");
  thread.push_stack("hat");
  let mut util =
    CompatBlockUtility::init(&mut thread, "fake", ExecutionContext::default());
  let sequencer = util.sequencer().cloned().unwrap();
  sequencer.retire_thread(util.thread());
  assert_eq!(thread.status, Status::Done);
  assert!(thread.stack().is_empty());
}

#[test]
fn yield_tick_comes_from_the_contract() {
  let fixture = Fixture::new();
  let mut thread = fixture.thread("hat");
  call_legacy_block(&mut thread, "fake", ExecutionContext::default(), |util| {
    util.yield_tick()
  });
  assert_eq!(thread.status, Status::YieldTick);
}
