#![no_main]
use libfuzzer_sys::fuzz_target;
use probenplan_libs::{Available, AvailabilityRecord, RehearsalQuery, TimeMerge};

fuzz_target!(|data: (Vec<AvailabilityRecord>, RehearsalQuery)| {
    let (records, query) = data;
    let window = query.window();

    let free = records.iter().get_availability(window);

    assert!(
        free.iter().all(|t| !t.is_empty() && window.contains(*t)),
        "Free time outside of the window or empty"
    );
    assert!(
        free.windows(2).all(|w| w[0].end() < w[1].start()),
        "Free times are not sorted, disjoint and apart"
    );

    let occurrences = records
        .iter()
        .flat_map(|r| r.occurrences(window))
        .collect::<Vec<_>>();
    assert!(
        occurrences
            .iter()
            .all(|o| free.iter().any(|t| t.contains(*o))),
        "Occurrence lost while merging"
    );
    assert_eq!(free, free.iter().time_merge(), "Merging is not idempotent");
});
