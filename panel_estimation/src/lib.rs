//! Estimation engine for a rotating-panel household expenditure survey:
//! per-record scope derivation, panel assembly, and the annual combination
//! of weighted quarterly estimates. See the [manual] module for the
//! long-form documentation.

pub mod builder;
mod config;
pub mod manual;

use log::{debug, info};

pub use crate::builder::PanelBuilder;
pub use crate::config::*;

const MONTHS_PER_QUARTER: u32 = 3;
const PANEL_QUARTERS: usize = 5;
const CALENDAR_QUARTERS: usize = 4;

/// How many calendar months of the nominal quarter this interview actually
/// reports on.
///
/// Interviews cover the three months before the interview month. For the
/// four in-year collection quarters, an interview held in January through
/// March only reaches `month - 1` months back into the tabulated quarter;
/// from April on the full quarter is covered. The fifth file is collected in
/// the first quarter of the following year and covers the `4 - month`
/// remaining months of the tabulated year.
pub fn months_in_scope(
    interview_month: i64,
    nominal_quarter: u8,
) -> Result<u32, EstimationError> {
    match nominal_quarter {
        1..=4 => match interview_month {
            1..=3 => Ok((interview_month - 1) as u32),
            4..=12 => Ok(MONTHS_PER_QUARTER),
            _ => Err(EstimationError::InvalidInput {
                message: format!("interview month {} outside of range", interview_month),
            }),
        },
        5 => match interview_month {
            1..=3 => Ok((4 - interview_month) as u32),
            _ => Err(EstimationError::InvalidInput {
                message: format!("interview month {} outside of range", interview_month),
            }),
        },
        _ => Err(EstimationError::InvalidInput {
            message: format!("nominal quarter {} outside of range", nominal_quarter),
        }),
    }
}

/// The compound identifier with its final digit removed.
pub fn consuming_unit_id(compound_id: i64) -> Result<i64, EstimationError> {
    split_compound_id(compound_id).map(|(unit, _)| unit)
}

/// The final digit of the compound identifier: which of the interview
/// occasions this record is for the consuming unit.
pub fn wave_id(compound_id: i64) -> Result<i64, EstimationError> {
    split_compound_id(compound_id).map(|(_, wave)| wave)
}

// Invariant: unit * 10 + wave reconstructs the compound identifier.
fn split_compound_id(compound_id: i64) -> Result<(i64, i64), EstimationError> {
    if compound_id < 10 {
        return Err(EstimationError::InvalidInput {
            message: format!("compound identifier {} has no unit digits", compound_id),
        });
    }
    Ok((compound_id / 10, compound_id % 10))
}

/// Derives the identifier and scope columns for one quarter file, using the
/// standard interview survey column names.
///
/// Returns a new table with the derived columns prepended and every original
/// column preserved. A single malformed record invalidates the whole
/// quarter; there is no best-effort output.
pub fn normalize_quarter(
    table: &Table,
    nominal_year: i32,
    nominal_quarter: u8,
) -> Result<Table, EstimationError> {
    normalize_quarter_with(table, nominal_year, nominal_quarter, &SourceColumns::DEFAULT)
}

/// [normalize_quarter] with explicit source column names.
pub fn normalize_quarter_with(
    table: &Table,
    nominal_year: i32,
    nominal_quarter: u8,
    source: &SourceColumns,
) -> Result<Table, EstimationError> {
    if !(1..=PANEL_QUARTERS as u8).contains(&nominal_quarter) {
        return Err(EstimationError::InvalidInput {
            message: format!("nominal quarter {} outside of range", nominal_quarter),
        });
    }
    let id_idx = require_column(table, source.compound_id)?;
    let month_idx = require_column(table, source.interview_month)?;
    let year_idx = require_column(table, source.interview_year)?;
    let weight_idx = require_column(table, source.weight)?;

    info!(
        "normalize_quarter: year {} quarter {}: {} records",
        nominal_year,
        nominal_quarter,
        table.rows.len()
    );

    let mut columns: Vec<String> = vec![
        NOMINAL_YEAR.to_string(),
        NOMINAL_QUARTER.to_string(),
        CONSUMING_UNIT_ID.to_string(),
        WAVE_ID.to_string(),
        INTERVIEW_MONTH.to_string(),
        INTERVIEW_YEAR.to_string(),
        WEIGHT.to_string(),
        MONTHS_IN_SCOPE.to_string(),
    ];
    columns.extend(table.columns.iter().cloned());

    let mut rows: Vec<Vec<Datum>> = Vec::with_capacity(table.rows.len());
    for row in table.rows.iter() {
        let compound = require_integer(row, id_idx, source.compound_id)?;
        let (unit, wave) = split_compound_id(compound)?;
        let interview_month = require_integer(row, month_idx, source.interview_month)?;
        let interview_year = require_integer(row, year_idx, source.interview_year)?;
        let weight = require_number(row, weight_idx, source.weight)?;
        let in_scope = months_in_scope(interview_month, nominal_quarter)?;

        let mut out = vec![
            Datum::Number(nominal_year as f64),
            Datum::Number(nominal_quarter as f64),
            Datum::Number(unit as f64),
            Datum::Number(wave as f64),
            Datum::Number(interview_month as f64),
            Datum::Number(interview_year as f64),
            Datum::Number(weight),
            Datum::Number(in_scope as f64),
        ];
        out.extend(row.iter().cloned());
        rows.push(out);
    }
    Ok(Table { columns, rows })
}

/// Concatenates five normalized quarter tables into the panel for one
/// survey year, sorted ascending by (consuming unit, wave).
///
/// Columns are aligned by name; a column absent from some quarter is filled
/// with [Datum::Empty] for that quarter's rows.
pub fn assemble_panel(quarters: &[Table]) -> Result<Panel, EstimationError> {
    if quarters.len() != PANEL_QUARTERS {
        return Err(EstimationError::ArityError {
            message: format!(
                "expected {} quarter tables, got {}",
                PANEL_QUARTERS,
                quarters.len()
            ),
        });
    }

    // Every table must agree on the nominal year before anything is merged.
    let mut years: Vec<i64> = Vec::new();
    for table in quarters.iter() {
        let year_idx = require_column(table, NOMINAL_YEAR)?;
        for row in table.rows.iter() {
            let year = require_integer(row, year_idx, NOMINAL_YEAR)?;
            if !years.contains(&year) {
                years.push(year);
            }
        }
    }
    if years.len() > 1 {
        return Err(EstimationError::ArityError {
            message: format!("quarter tables disagree on the nominal year: {:?}", years),
        });
    }

    // Union of the column names, in first-seen order.
    let mut columns: Vec<String> = Vec::new();
    for table in quarters.iter() {
        for name in table.columns.iter() {
            if !columns.contains(name) {
                columns.push(name.clone());
            }
        }
    }

    let mut rows: Vec<Vec<Datum>> = Vec::new();
    for table in quarters.iter() {
        let mapping: Vec<usize> = table
            .columns
            .iter()
            .map(|name| columns.iter().position(|c| c == name).unwrap())
            .collect();
        for row in table.rows.iter() {
            let mut out = vec![Datum::Empty; columns.len()];
            for (src_idx, dst_idx) in mapping.iter().enumerate() {
                out[*dst_idx] = row[src_idx].clone();
            }
            rows.push(out);
        }
    }

    let mut panel_table = Table { columns, rows };
    sort_by_unit_and_wave(&mut panel_table)?;
    info!(
        "assemble_panel: {} records across {} quarter tables",
        panel_table.rows.len(),
        PANEL_QUARTERS
    );
    Ok(Panel { table: panel_table })
}

fn sort_by_unit_and_wave(table: &mut Table) -> Result<(), EstimationError> {
    let unit_idx = require_column(table, CONSUMING_UNIT_ID)?;
    let wave_idx = require_column(table, WAVE_ID)?;
    let mut keyed: Vec<(i64, i64, Vec<Datum>)> = Vec::with_capacity(table.rows.len());
    for row in std::mem::take(&mut table.rows) {
        let unit = require_integer(&row, unit_idx, CONSUMING_UNIT_ID)?;
        let wave = require_integer(&row, wave_idx, WAVE_ID)?;
        keyed.push((unit, wave, row));
    }
    keyed.sort_by_key(|(unit, wave, _)| (*unit, *wave));
    table.rows = keyed.into_iter().map(|(_, _, row)| row).collect();
    Ok(())
}

/// Computes the annual estimate of `variable_name` over the panel with the
/// default options.
pub fn estimate_annual(
    panel: &Panel,
    variable_name: &str,
    variable_type: VariableType,
) -> Result<f64, EstimationError> {
    estimate_annual_with(panel, variable_name, variable_type, &EstimationOptions::DEFAULT)
}

/// Computes the annual estimate of `variable_name` over the panel.
///
/// Each nominal quarter with records yields a weighted ratio estimate; the
/// quarterly estimates are then combined according to the variable type. A
/// quarter whose total effective weight is zero yields NaN (or fails,
/// depending on `options`), and the NaN flows into the annual figure rather
/// than being masked.
pub fn estimate_annual_with(
    panel: &Panel,
    variable_name: &str,
    variable_type: VariableType,
    options: &EstimationOptions,
) -> Result<f64, EstimationError> {
    let table = &panel.table;
    check_single_year(table)?;

    let value_idx = require_column(table, variable_name)?;
    let quarter_idx = require_column(table, NOMINAL_QUARTER)?;
    let weight_idx = require_column(table, WEIGHT)?;
    let scope_idx = require_column(table, MONTHS_IN_SCOPE)?;

    info!(
        "estimate_annual: variable {:?} ({:?}) over {} records",
        variable_name,
        variable_type,
        table.rows.len()
    );

    let mut quarterly: Vec<(u8, f64)> = Vec::new();
    for quarter in 1..=PANEL_QUARTERS as u8 {
        let records =
            scoped_records(table, quarter, value_idx, quarter_idx, weight_idx, scope_idx)?;
        if records.is_empty() {
            debug!("estimate_annual: no records for quarter {}", quarter);
            continue;
        }
        let tally = tally_quarter(&records, variable_type);
        if tally.denominator == 0.0
            && options.degenerate_quarter == DegenerateQuarterRule::Fail
        {
            return Err(EstimationError::DegenerateQuarter { quarter });
        }
        let estimate = tally.numerator / tally.denominator;
        debug!(
            "estimate_annual: quarter {}: {} records, estimate {}",
            quarter,
            records.len(),
            estimate
        );
        quarterly.push((quarter, estimate));
    }

    let annual = combine_quarterly(&quarterly, variable_type);
    info!("estimate_annual: {:?} -> {}", variable_name, annual);
    Ok(annual)
}

fn check_single_year(table: &Table) -> Result<(), EstimationError> {
    let year_idx = require_column(table, NOMINAL_YEAR)?;
    let mut years: Vec<i64> = Vec::new();
    for row in table.rows.iter() {
        let year = require_integer(row, year_idx, NOMINAL_YEAR)?;
        if !years.contains(&year) {
            years.push(year);
        }
    }
    if years.len() > 1 {
        return Err(EstimationError::MultiYearUnsupported);
    }
    Ok(())
}

// One record of a quarter group, reduced to the fields the estimators use.
#[derive(PartialEq, Debug, Clone)]
struct ScopedRecord {
    weight: f64,
    proportion_in_scope: f64,
    value: f64,
}

fn scoped_records(
    table: &Table,
    quarter: u8,
    value_idx: usize,
    quarter_idx: usize,
    weight_idx: usize,
    scope_idx: usize,
) -> Result<Vec<ScopedRecord>, EstimationError> {
    let mut records: Vec<ScopedRecord> = Vec::new();
    for row in table.rows.iter() {
        let row_quarter = require_integer(row, quarter_idx, NOMINAL_QUARTER)?;
        if row_quarter != quarter as i64 {
            continue;
        }
        let weight = require_number(row, weight_idx, WEIGHT)?;
        let in_scope = require_number(row, scope_idx, MONTHS_IN_SCOPE)?;
        // A blank or non-numeric value cell is undefined and stays visible
        // as NaN in the quarter estimate.
        let value = row
            .get(value_idx)
            .and_then(|d| d.as_f64())
            .unwrap_or(f64::NAN);
        records.push(ScopedRecord {
            weight,
            proportion_in_scope: in_scope / MONTHS_PER_QUARTER as f64,
            value,
        });
    }
    Ok(records)
}

#[derive(PartialEq, Debug, Clone, Copy)]
struct QuarterTally {
    numerator: f64,
    denominator: f64,
}

// The weighted ratio estimate for one quarter group. A record with zero
// months in scope contributes to neither numerator nor denominator, so the
// division only ever happens at the aggregated quarter level.
fn tally_quarter(records: &[ScopedRecord], variable_type: VariableType) -> QuarterTally {
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for r in records.iter() {
        if r.proportion_in_scope == 0.0 {
            continue;
        }
        match variable_type {
            VariableType::Demographic => {
                let w = r.weight * r.proportion_in_scope;
                numerator += w * r.value;
                denominator += w;
            }
            VariableType::Expense => {
                numerator += r.weight * r.value;
                denominator += r.weight * r.proportion_in_scope;
            }
        }
    }
    QuarterTally {
        numerator,
        denominator,
    }
}

// Five waves of quarterly estimates stand for four calendar quarters, hence
// the 4/5 rescaling on the expense side.
fn combine_quarterly(quarterly: &[(u8, f64)], variable_type: VariableType) -> f64 {
    if quarterly.is_empty() {
        return f64::NAN;
    }
    let total: f64 = quarterly.iter().map(|(_, estimate)| *estimate).sum();
    match variable_type {
        VariableType::Demographic => total / quarterly.len() as f64,
        VariableType::Expense => total * CALENDAR_QUARTERS as f64 / PANEL_QUARTERS as f64,
    }
}

fn require_column(table: &Table, name: &str) -> Result<usize, EstimationError> {
    table
        .column_index(name)
        .ok_or_else(|| EstimationError::VariableNotFound {
            variable: name.to_string(),
        })
}

fn require_number(row: &[Datum], idx: usize, name: &str) -> Result<f64, EstimationError> {
    row.get(idx)
        .and_then(|d| d.as_f64())
        .ok_or_else(|| EstimationError::InvalidInput {
            message: format!("column {:?} holds a non-numeric value", name),
        })
}

fn require_integer(row: &[Datum], idx: usize, name: &str) -> Result<i64, EstimationError> {
    row.get(idx)
        .and_then(|d| d.as_i64())
        .ok_or_else(|| EstimationError::InvalidInput {
            message: format!("column {:?} holds a non-integer value", name),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    // (compound id, interview month, weight, value)
    fn raw_quarter(rows: &[(i64, i64, f64, f64)]) -> Table {
        Table::new(
            vec![
                "NEWID".to_string(),
                "QINTRVMO".to_string(),
                "QINTRVYR".to_string(),
                "FINLWT21".to_string(),
                "TOTEXPPQ".to_string(),
            ],
            rows.iter()
                .map(|(id, month, weight, value)| {
                    vec![
                        Datum::Number(*id as f64),
                        Datum::Number(*month as f64),
                        Datum::Number(2016.0),
                        Datum::Number(*weight),
                        Datum::Number(*value),
                    ]
                })
                .collect(),
        )
    }

    fn quarter(
        nominal_quarter: u8,
        rows: &[(i64, i64, f64, f64)],
    ) -> Table {
        normalize_quarter(&raw_quarter(rows), 2016, nominal_quarter).unwrap()
    }

    fn panel(quarters: Vec<Table>) -> Panel {
        assemble_panel(&quarters).unwrap()
    }

    #[test]
    fn scope_for_in_year_quarters_follows_the_interview_month() {
        for nominal_quarter in 1..=4 {
            assert_eq!(months_in_scope(1, nominal_quarter).unwrap(), 0);
            assert_eq!(months_in_scope(2, nominal_quarter).unwrap(), 1);
            assert_eq!(months_in_scope(3, nominal_quarter).unwrap(), 2);
            for interview_month in 4..=12 {
                assert_eq!(months_in_scope(interview_month, nominal_quarter).unwrap(), 3);
            }
        }
    }

    #[test]
    fn scope_for_the_fifth_file_counts_backwards() {
        assert_eq!(months_in_scope(1, 5).unwrap(), 3);
        assert_eq!(months_in_scope(2, 5).unwrap(), 2);
        assert_eq!(months_in_scope(3, 5).unwrap(), 1);
    }

    #[test]
    fn out_of_range_months_and_quarters_are_rejected() {
        for (interview_month, nominal_quarter) in
            [(0, 1), (13, 1), (-2, 3), (4, 5), (12, 5), (6, 0), (6, 6)]
        {
            let res = months_in_scope(interview_month, nominal_quarter);
            assert!(
                matches!(res, Err(EstimationError::InvalidInput { .. })),
                "expected InvalidInput for month {} quarter {}, got {:?}",
                interview_month,
                nominal_quarter,
                res
            );
        }
    }

    #[test]
    fn compound_identifiers_round_trip() {
        for compound in [10, 99, 1234561, 987654325] {
            let unit = consuming_unit_id(compound).unwrap();
            let wave = wave_id(compound).unwrap();
            assert_eq!(unit * 10 + wave, compound);
        }
        assert!(matches!(
            consuming_unit_id(7),
            Err(EstimationError::InvalidInput { .. })
        ));
    }

    #[test]
    fn normalization_prepends_derived_columns_and_keeps_the_rest() {
        let normalized = quarter(2, &[(1234561, 6, 1500.0, 42.0)]);
        assert_eq!(
            normalized.columns[..8],
            [
                NOMINAL_YEAR,
                NOMINAL_QUARTER,
                CONSUMING_UNIT_ID,
                WAVE_ID,
                INTERVIEW_MONTH,
                INTERVIEW_YEAR,
                WEIGHT,
                MONTHS_IN_SCOPE
            ]
            .map(String::from)
        );
        assert_eq!(normalized.columns[8], "NEWID");
        let row = &normalized.rows[0];
        assert_eq!(row[0], Datum::Number(2016.0));
        assert_eq!(row[1], Datum::Number(2.0));
        assert_eq!(row[2], Datum::Number(123456.0));
        assert_eq!(row[3], Datum::Number(1.0));
        assert_eq!(row[6], Datum::Number(1500.0));
        assert_eq!(row[7], Datum::Number(3.0));
        // The original cells follow unchanged.
        assert_eq!(row[8], Datum::Number(1234561.0));
        assert_eq!(row[12], Datum::Number(42.0));
    }

    #[test]
    fn one_malformed_record_fails_the_whole_quarter() {
        let raw = raw_quarter(&[(1234561, 6, 1500.0, 42.0), (1234572, 14, 900.0, 10.0)]);
        let res = normalize_quarter(&raw, 2016, 1);
        assert!(matches!(res, Err(EstimationError::InvalidInput { .. })));
        // The input table is left untouched either way.
        assert_eq!(raw.rows.len(), 2);
    }

    #[test]
    fn normalization_requires_the_source_columns() {
        let raw = Table::new(vec!["NEWID".to_string()], vec![]);
        let res = normalize_quarter(&raw, 2016, 1);
        assert!(matches!(
            res,
            Err(EstimationError::VariableNotFound { variable }) if variable == "QINTRVMO"
        ));
    }

    #[test]
    fn panels_require_exactly_five_quarters() {
        let quarters = vec![quarter(1, &[]), quarter(2, &[]), quarter(3, &[])];
        assert!(matches!(
            assemble_panel(&quarters),
            Err(EstimationError::ArityError { .. })
        ));
    }

    #[test]
    fn panels_reject_mismatched_years() {
        let mut quarters: Vec<Table> = (1..=4)
            .map(|q| quarter(q, &[(1234560 + q as i64, 6, 1000.0, 1.0)]))
            .collect();
        quarters
            .push(normalize_quarter(&raw_quarter(&[(1234565, 2, 1000.0, 1.0)]), 2017, 5).unwrap());
        assert!(matches!(
            assemble_panel(&quarters),
            Err(EstimationError::ArityError { .. })
        ));
    }

    #[test]
    fn panels_are_sorted_by_unit_and_wave() {
        let quarters = vec![
            quarter(1, &[(222221, 6, 1.0, 0.0), (111111, 6, 1.0, 0.0)]),
            quarter(2, &[(111112, 6, 1.0, 0.0)]),
            quarter(3, &[]),
            quarter(4, &[]),
            quarter(5, &[(222222, 2, 1.0, 0.0)]),
        ];
        let panel = panel(quarters);
        let unit_idx = panel.table.column_index(CONSUMING_UNIT_ID).unwrap();
        let wave_idx = panel.table.column_index(WAVE_ID).unwrap();
        let keys: Vec<(i64, i64)> = panel
            .table
            .rows
            .iter()
            .map(|row| {
                (
                    row[unit_idx].as_i64().unwrap(),
                    row[wave_idx].as_i64().unwrap(),
                )
            })
            .collect();
        assert_eq!(
            keys,
            vec![(11111, 1), (11111, 2), (22222, 1), (22222, 2)]
        );
    }

    #[test]
    fn concatenation_aligns_columns_by_name() {
        let mut wide = raw_quarter(&[(1234562, 6, 1000.0, 5.0)]);
        wide.columns.push("FAM_SIZE".to_string());
        wide.rows[0].push(Datum::Number(4.0));
        let quarters = vec![
            quarter(1, &[(1234561, 6, 1000.0, 3.0)]),
            normalize_quarter(&wide, 2016, 2).unwrap(),
            quarter(3, &[]),
            quarter(4, &[]),
            quarter(5, &[]),
        ];
        let panel = panel(quarters);
        let fam_idx = panel.table.column_index("FAM_SIZE").unwrap();
        assert_eq!(panel.table.rows[0][fam_idx], Datum::Empty);
        assert_eq!(panel.table.rows[1][fam_idx], Datum::Number(4.0));
    }

    #[test]
    fn estimation_rejects_multi_year_panels() {
        let a = quarter(1, &[(1234561, 6, 1000.0, 1.0)]);
        let mut table = a.clone();
        let b = normalize_quarter(&raw_quarter(&[(1234572, 6, 1000.0, 1.0)]), 2017, 1).unwrap();
        table.rows.extend(b.rows);
        let res = estimate_annual(&Panel { table }, "TOTEXPPQ", VariableType::Expense);
        assert_eq!(res, Err(EstimationError::MultiYearUnsupported));
    }

    #[test]
    fn variable_type_tags_parse_or_fail() {
        assert_eq!("expense".parse::<VariableType>(), Ok(VariableType::Expense));
        assert_eq!(
            "demographic".parse::<VariableType>(),
            Ok(VariableType::Demographic)
        );
        assert!(matches!(
            "income".parse::<VariableType>(),
            Err(EstimationError::InvalidVariableType { tag }) if tag == "income"
        ));
    }

    #[test]
    fn missing_variables_are_reported() {
        let panel = panel((1..=5).map(|q| quarter(q, &[])).collect());
        let res = estimate_annual(&panel, "NO_SUCH_VAR", VariableType::Expense);
        assert!(matches!(
            res,
            Err(EstimationError::VariableNotFound { variable }) if variable == "NO_SUCH_VAR"
        ));
    }

    #[test]
    fn demographic_estimates_average_the_quarterly_means() {
        // Two records per quarter, both fully in scope, weights 1000 and
        // 3000: each quarterly mean is (a + 3b) / 4.
        let values = [(10.0, 30.0), (20.0, 40.0), (30.0, 50.0), (40.0, 60.0), (50.0, 70.0)];
        let quarters: Vec<Table> = values
            .iter()
            .enumerate()
            .map(|(idx, (a, b))| {
                let q = (idx + 1) as u8;
                // The fifth file only allows interview months 1-3; month 1
                // keeps all three months in scope.
                let month = if q == 5 { 1 } else { 6 };
                quarter(
                    q,
                    &[
                        (1000001 + idx as i64 * 10, month, 1000.0, *a),
                        (2000001 + idx as i64 * 10, month, 3000.0, *b),
                    ],
                )
            })
            .collect();
        let panel = panel(quarters);
        let annual = estimate_annual(&panel, "TOTEXPPQ", VariableType::Demographic).unwrap();
        // Quarterly means are 25, 35, 45, 55, 65.
        assert!((annual - 45.0).abs() < EPS);
    }

    #[test]
    fn demographic_weighting_discounts_partial_scope() {
        let quarters = vec![
            quarter(
                1,
                &[(1000011, 6, 1000.0, 100.0), (2000011, 2, 1000.0, 40.0)],
            ),
            quarter(2, &[]),
            quarter(3, &[]),
            quarter(4, &[]),
            quarter(5, &[]),
        ];
        let panel = panel(quarters);
        let annual = estimate_annual(&panel, "TOTEXPPQ", VariableType::Demographic).unwrap();
        // (1 * 100 + 1/3 * 40) / (1 + 1/3) = 340 / 4 = 85.
        assert!((annual - 85.0).abs() < EPS);
    }

    #[test]
    fn expense_estimates_sum_quarters_and_rescale() {
        // All records fully in scope, so each quarterly estimate is the
        // plain weighted mean and the annual figure is their sum * 4/5.
        let values = [(10.0, 20.0), (20.0, 40.0), (30.0, 60.0), (40.0, 80.0), (50.0, 100.0)];
        let quarters: Vec<Table> = values
            .iter()
            .enumerate()
            .map(|(idx, (a, b))| {
                let q = (idx + 1) as u8;
                let month = if q == 5 { 1 } else { 6 };
                quarter(
                    q,
                    &[
                        (1000001 + idx as i64 * 10, month, 1000.0, *a),
                        (2000001 + idx as i64 * 10, month, 1000.0, *b),
                    ],
                )
            })
            .collect();
        let panel = panel(quarters);
        let annual = estimate_annual(&panel, "TOTEXPPQ", VariableType::Expense).unwrap();
        // Quarterly means are 15, 30, 45, 60, 75; their sum is 225.
        assert!((annual - 180.0).abs() < EPS);
    }

    #[test]
    fn expense_rescaling_matches_the_hand_computed_scenario() {
        // One consuming unit interviewed five times, weight 1000 throughout,
        // spending 100 each quarter; months in scope are 1, 3, 3, 3, 1.
        let quarters = vec![
            quarter(1, &[(1234561, 2, 1000.0, 100.0)]),
            quarter(2, &[(1234562, 6, 1000.0, 100.0)]),
            quarter(3, &[(1234563, 9, 1000.0, 100.0)]),
            quarter(4, &[(1234564, 12, 1000.0, 100.0)]),
            quarter(5, &[(1234565, 3, 1000.0, 100.0)]),
        ];
        let panel = panel(quarters);
        let annual = estimate_annual(&panel, "TOTEXPPQ", VariableType::Expense).unwrap();
        // Quarterly rates are 300, 100, 100, 100, 300; (sum 900) * 4/5.
        assert!((annual - 720.0).abs() < EPS);
    }

    #[test]
    fn zero_scope_records_contribute_nothing() {
        // The first record is interviewed in January of quarter 1, so none
        // of its months fall in scope and it must not move the estimate.
        let quarters = vec![
            quarter(
                1,
                &[(1000011, 1, 5000.0, 999.0), (2000011, 6, 1000.0, 50.0)],
            ),
            quarter(2, &[]),
            quarter(3, &[]),
            quarter(4, &[]),
            quarter(5, &[]),
        ];
        let panel = panel(quarters);
        let annual = estimate_annual(&panel, "TOTEXPPQ", VariableType::Expense).unwrap();
        assert!((annual - 50.0 * 4.0 / 5.0).abs() < EPS);
    }

    #[test]
    fn a_zero_weight_quarter_propagates_nan() {
        // Quarter 1 only has a record with zero months in scope, so its
        // total effective weight is zero.
        let quarters = vec![
            quarter(1, &[(1000011, 1, 1000.0, 10.0)]),
            quarter(2, &[(1000012, 6, 1000.0, 10.0)]),
            quarter(3, &[]),
            quarter(4, &[]),
            quarter(5, &[]),
        ];
        let panel = panel(quarters);
        let annual = estimate_annual(&panel, "TOTEXPPQ", VariableType::Expense).unwrap();
        assert!(annual.is_nan());
    }

    #[test]
    fn a_zero_weight_quarter_can_fail_instead() {
        let quarters = vec![
            quarter(1, &[(1000011, 1, 1000.0, 10.0)]),
            quarter(2, &[(1000012, 6, 1000.0, 10.0)]),
            quarter(3, &[]),
            quarter(4, &[]),
            quarter(5, &[]),
        ];
        let panel = panel(quarters);
        let options = EstimationOptions {
            degenerate_quarter: DegenerateQuarterRule::Fail,
        };
        let res = estimate_annual_with(&panel, "TOTEXPPQ", VariableType::Expense, &options);
        assert_eq!(res, Err(EstimationError::DegenerateQuarter { quarter: 1 }));
    }

    #[test]
    fn an_empty_panel_estimates_to_nan() {
        let panel = panel((1..=5).map(|q| quarter(q, &[])).collect());
        let annual = estimate_annual(&panel, "TOTEXPPQ", VariableType::Demographic).unwrap();
        assert!(annual.is_nan());
    }
}
