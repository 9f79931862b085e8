#![no_main]

use libfuzzer_sys::arbitrary::{self, Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;
use snbitmap::{BitmapError, SerialBitmap};

// Capacities around every tier boundary of the completeness scan.
const CAPACITIES: [u64; 16] = [
    1,     // partial byte only
    7,     // partial byte (max)
    8,     // one whole byte
    9,     // byte + 1 bit
    63,    // 7 bytes + 7 bits
    64,    // one word
    65,    // word + 1 bit
    71,    // word + 7 bits
    72,    // word + byte
    127,   // word + 7 bytes + 7 bits
    128,   // two words
    129,   // two words + 1 bit
    1_000, // the demo size
    4_095,
    4_096,
    4_097,
];

#[derive(Debug, Copy, Clone)]
struct Num(u64);

impl<'a> Arbitrary<'a> for Num {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(Self(u.arbitrary()?))
    }
}

#[derive(Arbitrary, Debug)]
enum Operation {
    Set(Num),
    TestAndSet(Num),
    Check(Num),
    SetOutOfRange(Num),
    CheckFull,
    CheckCount,
    CheckVacancies,
    FillAll,
    ImageRoundtrip,
    SerdeRoundtrip,
    Release,
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    capacity_idx: u8,
    initial: Vec<Num>,
    ops: Vec<Operation>,
}

/// Assert that the bitmap and the reference model agree on every query.
fn check_equal(bm: &SerialBitmap, model: &[bool]) {
    let capacity = model.len() as u64;
    assert_eq!(bm.capacity(), Ok(capacity));

    let expected_full = model.iter().all(|&b| b);
    assert_eq!(bm.is_full(), Ok(expected_full), "is_full mismatch");

    let expected_count = model.iter().filter(|&&b| b).count() as u64;
    assert_eq!(bm.count(), Ok(expected_count), "count mismatch");

    let vacancies: Vec<u64> = bm.vacancies().unwrap().collect();
    let expected: Vec<u64> = (0..capacity).filter(|&sn| !model[sn as usize]).collect();
    assert_eq!(vacancies, expected, "vacancies mismatch");
}

fuzz_target!(|input: FuzzInput| {
    let capacity = CAPACITIES[input.capacity_idx as usize % CAPACITIES.len()];

    let mut bm = SerialBitmap::create(capacity).unwrap();
    let mut model = vec![false; capacity as usize];

    for Num(n) in &input.initial {
        let sn = n % capacity;
        bm.set(sn).unwrap();
        model[sn as usize] = true;
    }
    check_equal(&bm, &model);

    for op in &input.ops {
        match *op {
            Operation::Set(Num(n)) => {
                let sn = n % capacity;
                bm.set(sn).unwrap();
                model[sn as usize] = true;
            }
            Operation::TestAndSet(Num(n)) => {
                let sn = n % capacity;
                assert_eq!(bm.test_and_set(sn), Ok(model[sn as usize]));
                model[sn as usize] = true;
            }
            Operation::Check(Num(n)) => {
                let sn = n % capacity;
                assert_eq!(bm.check(sn), Ok(model[sn as usize]), "check({sn}) mismatch");
            }
            Operation::SetOutOfRange(Num(n)) => {
                let sn = capacity.saturating_add(n);
                let before = bm.clone();
                assert_eq!(bm.set(sn), Err(BitmapError::OutOfRange { sn, capacity }));
                assert_eq!(bm, before);
            }
            Operation::CheckFull | Operation::CheckCount | Operation::CheckVacancies => {
                check_equal(&bm, &model);
            }
            Operation::FillAll => {
                for sn in 0..capacity {
                    bm.set(sn).unwrap();
                }
                model.fill(true);
                assert_eq!(bm.is_full(), Ok(true));
            }
            Operation::ImageRoundtrip => {
                let image = bm.as_bytes().to_vec();
                let parsed = SerialBitmap::from_bytes(image).unwrap();
                assert_eq!(parsed, bm);
            }
            Operation::SerdeRoundtrip => {
                let json = serde_json::to_vec(&bm).unwrap();
                let back: SerialBitmap = serde_json::from_slice(&json).unwrap();
                assert_eq!(back, bm);
            }
            Operation::Release => {
                bm.release();
                assert_eq!(bm.is_full(), Err(BitmapError::InvalidBitmap));
                assert_eq!(bm.check(0), Err(BitmapError::InvalidBitmap));
                assert_eq!(bm.set(0), Err(BitmapError::InvalidBitmap));
                return;
            }
        }
    }

    check_equal(&bm, &model);
});
