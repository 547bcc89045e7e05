/*!

This is the long-form manual for `panel_estimation`.

## The survey design

The interview survey follows a rotating panel of consuming units
(households). Each unit is interviewed up to five times, once per quarter,
and each interview asks about the three months before the interview month.
The data for one survey year is published as five quarter files: the four
in-year collection quarters, plus the file collected in the first quarter of
the following year, which is labeled nominal quarter 5 because it closes out
the current year's panel.

A nominal quarter is a publication label, not a calendar quarter. An
interview held in February of collection quarter 1 reports on November,
December and January, and only January belongs to the quarter being
tabulated. The number of reported months that fall inside the nominal
quarter is the record's *months in scope*:

| nominal quarter | interview month | months in scope |
|-----------------|-----------------|-----------------|
| 1-4             | 1, 2, 3         | month - 1       |
| 1-4             | 4 .. 12         | 3               |
| 5               | 1, 2, 3         | 4 - month       |

Any other combination is rejected as invalid input. There is no partial
output: a single malformed record fails its whole quarter.

## Input format

[normalize_quarter](crate::normalize_quarter) takes a [Table](crate::Table)
(named columns, [Datum](crate::Datum) cells) plus the nominal year and
quarter, and prepends eight derived columns: `nominal_year`,
`nominal_quarter`, `consuming_unit_id`, `wave_id`, `interview_month`,
`interview_year`, `weight` and `months_in_scope`. The consuming unit and
wave identifiers come from splitting the compound record identifier at its
final digit. The raw column names default to the interview survey's
(`NEWID`, `QINTRVMO`, `QINTRVYR`, `FINLWT21`) and can be overridden with
[SourceColumns](crate::SourceColumns) through
[normalize_quarter_with](crate::normalize_quarter_with).

[assemble_panel](crate::assemble_panel) (or the incremental
[PanelBuilder](crate::PanelBuilder)) concatenates the five normalized
tables into one [Panel](crate::Panel), aligning columns by name and sorting
by (consuming unit, wave). All five tables must carry the same nominal
year.

## Estimation

[estimate_annual](crate::estimate_annual) computes one annual figure for a
named variable. Records are grouped by nominal quarter, and each group
yields a weighted ratio estimate driven by
`proportion_in_scope = months_in_scope / 3`:

* **demographic** variables (point-in-time quantities such as family size):
  effective weight `weight * proportion_in_scope`, estimate
  `sum(w * value) / sum(w)`. A partial-scope record is simply weaker
  evidence; the value itself is not rescaled.
* **expense** variables (flows accumulated over the in-scope months):
  estimate `sum(weight * value) / sum(weight * proportion_in_scope)`. The
  scope proportion in the denominator rescales partial-period spending up
  to a full-quarter rate.

A record with zero months in scope contributes to neither sum, so no
per-record division by zero can occur. The annual combination is the mean
of the quarterly estimates for demographic variables, and the sum of the
quarterly estimates times 4/5 for expense variables: five waves of
quarterly rates stand for four calendar quarters of the tabulated year.

## Undefined estimates

A quarter whose records carry zero total effective weight has no defined
estimate. By default its estimate is NaN and the NaN flows into the annual
figure, keeping the gap visible instead of quietly dropping the quarter.
Callers that prefer a hard stop can pass
[DegenerateQuarterRule::Fail](crate::DegenerateQuarterRule) through
[estimate_annual_with](crate::estimate_annual_with).

Estimation over a panel that spans more than one nominal year always fails:
pooled multi-year estimation is out of scope for this library.

*/
