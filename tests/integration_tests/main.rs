use std::io::Cursor;

use probe_profile::{
    probe_function, probe_section, probe_syscall, Call, CallFlags, OutputFormat, Probe, Profile,
    ReadError, ReadFlags, Recorder, StatsWriter,
};

/// Runs a small scripted workload against a fresh recorder:
///
/// work
/// ├── step (suffix "parse")
/// │   └── fetch (syscall)
/// └── step (suffix "render")
fn record_workload(recorder: &Recorder) {
    let _work = Probe::enter_in(recorder, "app::work", "app::work", "", CallFlags::empty());
    {
        let _parse = Probe::enter_in(recorder, "app::step", "app::step", "parse", CallFlags::empty());
        let _fetch = Probe::enter_in(recorder, "app::fetch", "app::fetch", "", CallFlags::SYSCALL);
    }
    let _render = Probe::enter_in(recorder, "app::step", "app::step", "render", CallFlags::empty());
}

fn sorted_calls(profile: &Profile) -> Vec<Call> {
    let mut calls: Vec<Call> = profile.calls().cloned().collect();
    calls.sort_by_key(|c| c.id());
    calls
}

fn sorted_sections(profile: &Profile) -> Vec<(String, String, u32)> {
    let mut sections: Vec<_> = profile
        .functions()
        .flat_map(|f| {
            f.sections()
                .map(move |s| (f.nice().to_string(), s.name().to_string(), s.id().get()))
        })
        .collect();
    sections.sort();
    sections
}

#[test]
fn workload_records_the_expected_tree() {
    let recorder = Recorder::new();
    record_workload(&recorder);

    let profile = recorder.profile();
    let calls = sorted_calls(&profile);
    assert_eq!(calls.len(), 4);

    // Ids are a strictly increasing sequence in activation order.
    let ids: Vec<u32> = calls.iter().map(|c| c.id().get()).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);

    let work = &calls[0];
    let parse = &calls[1];
    let fetch = &calls[2];
    let render = &calls[3];
    assert_eq!(work.parent(), None);
    assert_eq!(parse.parent(), Some(work.id()));
    assert_eq!(fetch.parent(), Some(parse.id()));
    assert_eq!(render.parent(), Some(work.id()));
    assert!(fetch.is_syscall());
    assert!(!render.is_syscall());

    // "app::step" carries two sections, one per suffix, with distinct ids.
    let step = profile.function_by_name("app::step").unwrap();
    let section_ids: Vec<_> = step.sections().map(|s| s.id()).collect();
    assert_eq!(step.sections().count(), 2);
    assert_ne!(section_ids[0], section_ids[1]);
    assert_ne!(parse.function(), render.function());
}

#[test]
fn binary_file_round_trip() {
    let recorder = Recorder::new();
    record_workload(&recorder);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.stats");

    let profile = recorder.profile();
    probe_profile::write_file(
        &path,
        OutputFormat::Binary,
        &profile,
        recorder.ticks_per_second(),
    )
    .unwrap();

    let contents = probe_profile::read_file(&path, ReadFlags::empty()).unwrap();
    assert_eq!(contents.second(), recorder.ticks_per_second());
    assert_eq!(sorted_calls(&profile), sorted_calls(contents.profile()));
    assert_eq!(sorted_sections(&profile), sorted_sections(contents.profile()));
}

#[test]
fn xml_file_round_trip_with_markup_in_names() {
    let recorder = Recorder::new();
    let nasty = "parse<T>(a & b) \"quoted\"";
    {
        let _probe = Probe::enter_in(&recorder, nasty, nasty, "x > y", CallFlags::empty());
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.xstats");

    let profile = recorder.profile();
    probe_profile::write_file(&path, OutputFormat::Xml, &profile, 1000).unwrap();

    let contents = probe_profile::read_file(&path, ReadFlags::empty()).unwrap();
    assert_eq!(contents.second(), 1000);

    let function = contents.profile().function_by_name(nasty).unwrap();
    assert_eq!(function.nice(), nasty);
    assert!(function.section("x > y").is_some());
    assert_eq!(sorted_calls(&profile), sorted_calls(contents.profile()));
}

#[test]
fn rewriting_a_loaded_profile_is_byte_identical() {
    let recorder = Recorder::new();
    record_workload(&recorder);

    let mut first = Vec::new();
    probe_profile::write(&mut first, OutputFormat::Binary, &recorder.profile(), 123).unwrap();

    let contents = probe_profile::read(Cursor::new(&first), ReadFlags::empty()).unwrap();
    let mut second = Vec::new();
    probe_profile::write(
        &mut second,
        OutputFormat::Binary,
        contents.profile(),
        contents.second(),
    )
    .unwrap();

    assert_eq!(first, second);
}

#[test]
fn format_detection_picks_the_right_codec() {
    let recorder = Recorder::new();
    record_workload(&recorder);
    let profile = recorder.profile();

    let dir = tempfile::tempdir().unwrap();
    for format in [OutputFormat::Binary, OutputFormat::Xml] {
        let path = dir.path().join(match format {
            OutputFormat::Binary => "detect.bin",
            OutputFormat::Xml => "detect.xml",
        });
        probe_profile::write_file(&path, format, &profile, 42).unwrap();
        let contents = probe_profile::read_file(&path, ReadFlags::empty()).unwrap();
        assert_eq!(contents.second(), 42);
        assert_eq!(sorted_calls(&profile), sorted_calls(contents.profile()));
    }
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = probe_profile::read_file(dir.path().join("absent.stats"), ReadFlags::empty());
    assert!(matches!(err, Err(ReadError::Io(_))));
}

#[test]
fn unknown_function_in_a_file_recovers_or_fails_by_flag() {
    let text = "<stats second=\"1\">\
                <functions><fn id=\"1\" name=\"known\"/></functions>\
                <calls>\
                <call id=\"1\" function=\"1\" duration=\"5\"/>\
                <call id=\"2\" function=\"999999\" duration=\"6\"/>\
                </calls></stats>";

    let contents =
        probe_profile::read(Cursor::new(text.as_bytes()), ReadFlags::empty()).unwrap();
    let placeholder = contents
        .profile()
        .function_by_name("<unknown-999999>")
        .unwrap();
    let section = placeholder.section("").unwrap();
    assert_eq!(section.id().get(), 999_999);
    assert_eq!(section.calls().len(), 1);
    assert_eq!(contents.profile().calls().count(), 2);

    let strict = probe_profile::read(
        Cursor::new(text.as_bytes()),
        ReadFlags::FAIL_UNKNOWN_FUNCTION,
    );
    assert!(matches!(strict, Err(ReadError::UnknownFunction(999_999))));
}

#[test]
fn stats_writer_dumps_on_drop() {
    let recorder = Recorder::new();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("on_drop.stats");

    {
        let _stats = StatsWriter::for_recorder(&recorder, &path, OutputFormat::Binary);
        record_workload(&recorder);
    }

    let contents = probe_profile::read_file(&path, ReadFlags::empty()).unwrap();
    assert_eq!(contents.profile().calls().count(), 4);
    assert_eq!(contents.second(), recorder.ticks_per_second());
}

#[test]
fn macros_plant_probes_on_the_global_recorder() {
    fn traced_helper() {
        probe_function!();
        probe_syscall!();
    }

    fn tagged_helper() {
        probe_section!(probe, "inner-loop");
        assert!(probe.call_id().get() > 0);
    }

    traced_helper();
    tagged_helper();

    let profile = Recorder::global().profile();
    let traced = profile
        .functions()
        .find(|f| f.name().contains("traced_helper"))
        .unwrap();
    // Both macro probes in `traced_helper` share one section.
    assert_eq!(traced.sections().count(), 1);
    let calls = traced.section("").unwrap().calls();
    assert!(calls.len() >= 2);
    assert!(calls.iter().any(Call::is_syscall));

    let tagged = profile
        .functions()
        .find(|f| f.name().contains("tagged_helper"))
        .unwrap();
    assert!(tagged.section("inner-loop").is_some());
}

#[test]
fn concurrent_probes_keep_per_thread_nesting() {
    let recorder = Recorder::new();

    std::thread::scope(|scope| {
        for worker in 0..4 {
            let recorder = &recorder;
            scope.spawn(move || {
                let name = format!("worker::{worker}");
                for _ in 0..25 {
                    let outer =
                        Probe::enter_in(recorder, &name, &name, "", CallFlags::empty());
                    let inner = Probe::enter_in(
                        recorder,
                        &name,
                        &name,
                        "inner",
                        CallFlags::empty(),
                    );
                    assert_eq!(
                        recorder
                            .profile()
                            .call_by_id(inner.call_id())
                            .unwrap()
                            .parent(),
                        Some(outer.call_id())
                    );
                }
            });
        }
    });

    let profile = recorder.profile();
    let calls = sorted_calls(&profile);
    assert_eq!(calls.len(), 4 * 25 * 2);

    // Ids are unique and strictly positive.
    let mut ids: Vec<u32> = calls.iter().map(|c| c.id().get()).collect();
    ids.dedup();
    assert_eq!(ids.len(), calls.len());
    assert!(ids.iter().all(|&id| id > 0));

    // Every parent link stays within the same worker's two sections.
    for call in &calls {
        if let Some(parent) = call.parent() {
            let parent = profile.call_by_id(parent).unwrap();
            let child_section = profile.section_by_id(call.function()).unwrap();
            let parent_section = profile.section_by_id(parent.function()).unwrap();
            assert_eq!(child_section.name(), "inner");
            assert_eq!(parent_section.name(), "");
        }
    }

    // A binary round trip of the concurrent profile holds together.
    let mut bytes = Vec::new();
    probe_profile::write(&mut bytes, OutputFormat::Binary, &profile, 1).unwrap();
    let contents = probe_profile::read(Cursor::new(bytes), ReadFlags::empty()).unwrap();
    assert_eq!(sorted_calls(contents.profile()), calls);
}

#[test]
fn durations_in_files_are_the_recorded_ticks() {
    let recorder = Recorder::new();
    {
        let _probe = Probe::enter_in(&recorder, "f", "f", "", CallFlags::empty());
        std::thread::sleep(std::time::Duration::from_millis(1));
    }

    let profile = recorder.profile();
    let recorded = profile.calls().next().unwrap().duration();
    assert!(recorded > 0);

    let mut bytes = Vec::new();
    probe_profile::write(
        &mut bytes,
        OutputFormat::Xml,
        &profile,
        recorder.ticks_per_second(),
    )
    .unwrap();
    let contents = probe_profile::read(Cursor::new(bytes), ReadFlags::empty()).unwrap();
    let loaded = contents.profile().calls().next().unwrap();
    assert_eq!(loaded.duration(), recorded);
    assert_eq!(
        contents.own_duration(loaded.id()),
        Some(recorded)
    );
}
