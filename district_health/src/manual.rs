/*!

This is the long-form manual for `district_health` and `dhirank`.

## Input sources

Three kinds of daily extracts are accepted, all in CSV with a header row:

* `enrolment` new registrations, split by age band
* `demographic` demographic updates (address, name, phone)
* `biometric` biometric revalidations

### `enrolment`

```text
date,state,district,pincode,age_0_5,age_5_17,age_18_greater
02-03-2025,Odisha,Puri,752001,12,40,3
```

### `demographic`

```text
date,state,district,pincode,demo_age_5_17,demo_age_17_
02-03-2025,Odisha,Puri,752001,5,61
```

### `biometric`

```text
date,state,district,pincode,bio_age_5_17,bio_age_17_
02-03-2025,Odisha,Puri,752001,33,18
```

The trailing underscore in `demo_age_17_` and `bio_age_17_` is part of the
upstream export and is accepted as-is.

Dates are day-first: `02-03-2025` and `02/03/2025` both mean March 2nd.
The ISO notation `2025-03-02` is also accepted. Rows whose date parses in
none of these notations are dropped and counted, never fatal.

Each source may be given as several files (`-e` etc. can be repeated); the
chunks are concatenated before deduplication.

## Geography cleanup

State and district names arrive with case variants, stray whitespace,
historical spellings and data-entry noise. Cleanup is entirely table-driven:

1. trim and title-case the raw name;
2. look it up in a curated rename table (`Orissa` becomes `Odisha`,
   `Bangalore` becomes `Bengaluru Urban`);
3. district names containing an address-like keyword (`near`, `road`,
   `hospital`, `ashram`, `lane`, `cross`) are replaced by `Other`.

There is no fuzzy matching: a variant absent from the tables passes through
title-cased. Cleanup is idempotent, so re-running the pipeline over its own
output changes nothing.

## Reconciliation

The three sources are joined on `(date, state, district, pincode)` after
cleanup. The join is a full outer join: a key present in only one source
still produces a row, with the missing sources' counters at zero. Rows of
one source that collapse onto the same key after cleanup have their
counters summed.

## Indicators

For every unified row:

| indicator            | definition                                              |
|----------------------|---------------------------------------------------------|
| `mbu_compliance`     | `bio_age_5_17 / (age_5_17 + 1)`                         |
| `mobility_index`     | `demo_age_17_ / (age_18_greater + demo_age_17_ + 1)`    |
| `saturation_ratio`   | `total_updates / (total_activity + 1)`                  |
| `late_adopter_ratio` | `age_18_greater / (total_enrolment + 1)`                |

The `+ 1` in every denominator keeps the ratios finite on sparse rows.

The composite `health_score` min-max normalizes `mbu_compliance` and
`saturation_ratio` over the dataset and combines them with weights 40 and
60, giving a value in `[0, 100]`. Because the bounds come from the dataset
itself, scores from different runs are only comparable when computed against
the same captured bounds (see `indicator_bounds` in the API).

## Ranking

Rows are grouped by state, by state and district (the default), or by
pincode; the chosen indicator is averaged across each group with all dates
pooled, and groups are listed in descending order of the mean. Ties keep
their first-encountered order, so ranking is deterministic.

## Output

The report is a CSV ranking:

```text
state,district,health_score
Odisha,Puri,78.21
Odisha,Cuttack,64.05
```

The header adapts to the grouping and metric chosen. With `-r`, the
generated report is compared against a reference file and the program fails
on any difference.

 */
