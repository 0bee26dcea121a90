#![no_main]
use libfuzzer_sys::fuzz_target;
use probenplan_libs::{
    group_by_member, AvailabilityRecord, Available, Member, RehearsalQuery, SlotFinder,
};
use std::collections::BTreeSet;

fuzz_target!(|data: (Vec<AvailabilityRecord>, RehearsalQuery, u8)| {
    #[cfg(feature = "log")]
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}] {}",
                record.target(),
                record.level(),
                message
            ))
        })
        .level(log::LevelFilter::Debug)
        .chain(std::io::stdout())
        .apply();

    let (records, query, top_k) = data;
    let roster: Vec<Member> = (0..5)
        .map(|i| Member::new(&format!("member-{}", i), "", ""))
        .collect();
    let everyone: BTreeSet<String> = roster.iter().map(|m| m.id.clone()).collect();
    let availability = group_by_member(records);

    let slots = SlotFinder::new()
        .with_top_k(usize::from(top_k))
        .find(&roster, &availability, &query)
        .expect("generated input is well formed");

    assert!(slots.len() <= usize::from(top_k), "More slots than requested");

    for slot in &slots {
        assert_eq!(
            slot.time().duration().num_minutes(),
            query.duration_minutes,
            "Slot of the wrong length"
        );
        assert!(
            query.window().contains(slot.time()),
            "Slot {} outside of {}",
            slot.time(),
            query.window()
        );
        assert!(slot.attendance() >= query.minimum_members.max(1));

        let all: BTreeSet<String> = slot
            .available_members
            .union(&slot.unavailable_members)
            .cloned()
            .collect();
        assert_eq!(all, everyone, "Members missing from {}", slot.time());

        for member in &slot.available_members {
            let free = availability[member]
                .iter()
                .get_availability(query.window());
            assert!(
                free.iter().any(|t| t.contains(slot.time())),
                "{} is not free for all of {}",
                member,
                slot.time()
            );
        }
    }

    assert!(
        slots.windows(2).all(|w| w[0].attendance() > w[1].attendance()
            || (w[0].attendance() == w[1].attendance() && w[0].start < w[1].start)),
        "Slots are not ranked"
    );
});
