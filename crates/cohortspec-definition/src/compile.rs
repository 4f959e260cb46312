//! Validation and compilation of study definitions
//!
//! Compilation runs every check before giving up, so one pass reports all
//! errors in a definition. Non-fatal findings (suspicious simulation hints,
//! codelists with known quality problems) are returned as warnings.

use crate::format::DateFormat;
use crate::measure::POPULATION;
use crate::plan::{
    CARE_HOME_ATTRIBUTES, CategoryTable, CompiledRule, CompiledStudy, CompiledVariable,
    DateWindow, DeathOutput, DerivedColumn, EventOutput, EventQuery, EventSource, Selection,
};
use crate::rule::{
    AdmissionReturning, Category, ConsultationReturning, DateOfMatch, DeathReturning,
    EmergencyReturning, EventReturning, MatchSelection, Rule,
};
use crate::study::StudyDefinition;
use crate::variable::VariableDecl;
use crate::window::TimeWindow;
use chrono::NaiveDate;
use cohortspec_ast::{DateAnchor, DateExpr, Expression};
use cohortspec_codelist::{Codelist, CodelistRegistry, CodingSystem};
use cohortspec_diagnostics::{
    COH0005, COH0100, COH0101, COH0102, COH0103, COH0104, COH0105, COH0106, COH0107, COH0108, COH0109,
    COH0110, COH0111, COH0112, COH0113, COH0115, COH0116, COH0117, COH0118, COH0310, CohortError,
    Diagnostic, ErrorBuilder, ErrorCode, Result,
};
use cohortspec_parser::{parse_date_expr, parse_iso_date, parse_predicate};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

const CLINICAL_SYSTEMS: &[CodingSystem] =
    &[CodingSystem::Snomed, CodingSystem::Ctv3, CodingSystem::Dmd];
const DIAGNOSIS_SYSTEMS: &[CodingSystem] = &[CodingSystem::Icd10];

/// Outcome of checking a study: the plan when there were no errors, plus
/// everything that was found along the way
#[derive(Debug)]
pub struct Validation {
    pub study: Option<CompiledStudy>,
    pub errors: Vec<CohortError>,
    pub warnings: Vec<Diagnostic>,
}

impl Validation {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<CompiledStudy> {
        match (CohortError::from_many(self.errors), self.study) {
            (Some(err), _) => Err(err),
            (None, Some(study)) => Ok(study),
            (None, None) => Err(CohortError::specification(
                COH0110,
                "Study did not compile",
            )),
        }
    }
}

/// Check a study against a codelist registry without failing early
pub fn validate(study: &StudyDefinition, registry: &CodelistRegistry) -> Validation {
    Compiler::new(study, registry).run()
}

/// Compile a study into an extraction plan
pub fn compile(study: &StudyDefinition, registry: &CodelistRegistry) -> Result<CompiledStudy> {
    validate(study, registry).into_result()
}

/// Prefix a parse error with the variable it came from
fn in_subject(err: CohortError, subject: &str) -> CohortError {
    match err {
        CohortError::Parse {
            code,
            message,
            expression,
            location,
        } => CohortError::Parse {
            code,
            message: format!("{}: {}", subject, message),
            expression,
            location,
        },
        other => other,
    }
}

fn spec_error(code: ErrorCode, subject: &str, message: String) -> CohortError {
    ErrorBuilder::new(code, message)
        .subject(subject)
        .specification()
}

struct Compiler<'a> {
    study: &'a StudyDefinition,
    registry: &'a CodelistRegistry,
    index_date: Option<NaiveDate>,
    errors: Vec<CohortError>,
    warnings: Vec<Diagnostic>,
    /// Codelists used, with the first variable using them
    used_codelists: Vec<(String, String)>,
    /// Compiled variables and whether each resolves to a date
    date_valued: HashMap<String, bool>,
}

impl<'a> Compiler<'a> {
    fn new(study: &'a StudyDefinition, registry: &'a CodelistRegistry) -> Self {
        Self {
            study,
            registry,
            index_date: None,
            errors: Vec::new(),
            warnings: Vec::new(),
            used_codelists: Vec::new(),
            date_valued: HashMap::new(),
        }
    }

    fn error(&mut self, code: ErrorCode, subject: &str, message: String) {
        self.errors.push(spec_error(code, subject, message));
    }

    fn run(mut self) -> Validation {
        let study = self.study;

        if let Some(text) = &study.index_date {
            self.index_date = parse_iso_date(text);
            if self.index_date.is_none() {
                self.errors.push(CohortError::parse(
                    COH0005,
                    format!("index_date '{}' is not a YYYY-MM-DD date", text),
                    text.as_str(),
                ));
            }
        }

        let declarations = study.flattened();
        let positions = self.positions(&declarations);

        let mut compiled: Vec<Option<CompiledVariable>> = Vec::with_capacity(declarations.len());
        for (position, (decl, hidden)) in declarations.iter().enumerate() {
            let variable = self.compile_variable(decl, *hidden, position, &positions);
            compiled.push(variable);
        }

        let population = self.population(&positions);
        self.check_columns(&compiled);
        self.check_measures(&declarations);
        self.check_expectations(&declarations);
        self.codelist_warnings();

        if !self.errors.is_empty() {
            return Validation {
                study: None,
                errors: self.errors,
                warnings: self.warnings,
            };
        }

        let variables: Vec<CompiledVariable> = compiled.into_iter().flatten().collect();
        let order = match topological_order(&variables) {
            Ok(order) => order,
            Err(stuck) => {
                let names: Vec<&str> = stuck.iter().map(|&i| variables[i].name.as_str()).collect();
                self.errors.push(spec_error(
                    COH0104,
                    names.first().copied().unwrap_or_default(),
                    format!("Circular dependency between {}", names.join(", ")),
                ));
                return Validation {
                    study: None,
                    errors: self.errors,
                    warnings: self.warnings,
                };
            }
        };

        let columns = output_columns(&variables);
        let mut slots: Vec<Option<CompiledVariable>> = variables.into_iter().map(Some).collect();
        let ordered: Vec<CompiledVariable> = order.into_iter().filter_map(|i| slots[i].take()).collect();

        let Some(population) = population else {
            return Validation {
                study: None,
                errors: vec![CohortError::specification(COH0110, "Study has no population")],
                warnings: self.warnings,
            };
        };

        log::debug!(
            "compiled study '{}': {} variables, {} columns, {} measures",
            study.name,
            ordered.len(),
            columns.len(),
            study.measures.len()
        );

        Validation {
            study: Some(CompiledStudy {
                name: study.name.clone(),
                index_date: self.index_date,
                default_expectations: study.default_expectations.clone(),
                population,
                variables: ordered,
                columns,
                measures: study.measures.clone(),
                warnings: self.warnings.clone(),
            }),
            errors: Vec::new(),
            warnings: self.warnings,
        }
    }

    /// Declaration position of each name; duplicates are reported
    fn positions(&mut self, declarations: &[(&'a VariableDecl, bool)]) -> HashMap<&'a str, usize> {
        let mut positions = HashMap::new();
        for (position, (decl, _)) in declarations.iter().enumerate() {
            let name = decl.name.as_str();
            if name == POPULATION {
                self.error(COH0102, name, "'population' is reserved".to_string());
            }
            if positions.insert(name, position).is_some() {
                self.error(COH0102, name, format!("Variable '{}' is declared twice", name));
                // Keep the first declaration as the reference point
                if let Some(first) = declarations.iter().position(|(d, _)| d.name == name) {
                    positions.insert(name, first);
                }
            }
        }
        positions
    }

    fn compile_variable(
        &mut self,
        decl: &VariableDecl,
        hidden: bool,
        position: usize,
        positions: &HashMap<&str, usize>,
    ) -> Option<CompiledVariable> {
        let name = decl.name.as_str();
        let (rule, date_column) = self.compile_rule(name, &decl.rule)?;
        let dependencies = rule_dependencies(&rule);

        let mut ok = true;
        for dependency in &dependencies {
            match positions.get(dependency.as_str()) {
                None => {
                    self.error(COH0100, name, format!("Undefined variable '{}'", dependency));
                    ok = false;
                }
                Some(_) if dependency == name => {
                    self.error(COH0104, name, format!("'{}' refers to itself", name));
                    ok = false;
                }
                Some(&at) if at > position => {
                    self.error(
                        COH0103,
                        name,
                        format!("'{}' is declared after '{}' but used by it", dependency, name),
                    );
                    ok = false;
                }
                Some(_) => {}
            }
        }
        // Every dependency outside a categorisation is a date anchor
        if !matches!(rule, CompiledRule::Categorised(_)) {
            for dependency in &dependencies {
                if self.date_valued.get(dependency.as_str()) == Some(&false) {
                    self.error(
                        COH0118,
                        name,
                        format!("'{}' is anchored on '{}', which does not return a date", name, dependency),
                    );
                    ok = false;
                }
            }
        }
        if !ok {
            return None;
        }
        self.date_valued.insert(name.to_string(), rule.returns_date());

        log::debug!("compiled '{}' ({}) after {:?}", name, decl.rule.kind(), dependencies);
        Some(CompiledVariable {
            name: name.to_string(),
            hidden,
            rule,
            dependencies,
            expectations: decl
                .return_expectations
                .merged_over(&self.study.default_expectations),
            date_column,
        })
    }

    fn compile_rule(
        &mut self,
        name: &str,
        rule: &Rule,
    ) -> Option<(CompiledRule, Option<DerivedColumn>)> {
        match rule {
            Rule::ClinicalEvents(r) => {
                let codelist = self.codelist(name, &r.codelist, CLINICAL_SYSTEMS);
                let window = self.window(name, &r.window);
                let value_returning = matches!(
                    r.returning,
                    EventReturning::Date | EventReturning::NumericValue | EventReturning::Category
                );
                let selection = self.selection(name, r.selection, value_returning);
                let output = match r.returning {
                    EventReturning::BinaryFlag => EventOutput::BinaryFlag,
                    EventReturning::Date => EventOutput::Date(r.date_format.unwrap_or_default()),
                    EventReturning::NumericValue => EventOutput::NumericValue,
                    EventReturning::NumberOfMatchesInPeriod => EventOutput::Count,
                    EventReturning::Category => EventOutput::Category,
                };

                let mut ok = true;
                if let Some(list) = &codelist {
                    if output == EventOutput::Category && list.categories().is_empty() {
                        self.error(
                            COH0109,
                            name,
                            format!("Codelist '{}' has no categories to return", list.name()),
                        );
                        ok = false;
                    }
                }
                let date_column = self.date_of_match(name, r.returning, &r.date_of_match);
                if r.date_of_match.include_date_of_match && date_column.is_none() {
                    ok = false;
                }
                self.warn_unused_format(name, r.date_format, output);

                let query = EventQuery {
                    source: EventSource::ClinicalEvents,
                    codelist: Some(codelist?),
                    window: window?,
                    selection: selection?,
                    output,
                };
                ok.then_some((CompiledRule::Events(query), date_column))
            }
            Rule::AdmittedToHospital(r) => {
                let codelist = r
                    .with_these_diagnoses
                    .as_deref()
                    .map(|list| self.codelist(name, list, DIAGNOSIS_SYSTEMS));
                let window = self.window(name, &r.window);
                let value_returning = r.returning == AdmissionReturning::DateAdmitted;
                let selection = self.selection(name, r.selection, value_returning);
                let output = match r.returning {
                    AdmissionReturning::BinaryFlag => EventOutput::BinaryFlag,
                    AdmissionReturning::DateAdmitted => {
                        EventOutput::Date(r.date_format.unwrap_or_default())
                    }
                    AdmissionReturning::NumberOfMatchesInPeriod => EventOutput::Count,
                };
                self.warn_unused_format(name, r.date_format, output);
                let query = EventQuery {
                    source: EventSource::Admissions,
                    codelist: match codelist {
                        Some(list) => Some(list?),
                        None => None,
                    },
                    window: window?,
                    selection: selection?,
                    output,
                };
                Some((CompiledRule::Events(query), None))
            }
            Rule::AttendedEmergencyCare(r) => {
                let window = self.window(name, &r.window);
                let value_returning = r.returning == EmergencyReturning::DateArrived;
                let selection = self.selection(name, r.selection, value_returning);
                let output = match r.returning {
                    EmergencyReturning::BinaryFlag => EventOutput::BinaryFlag,
                    EmergencyReturning::DateArrived => {
                        EventOutput::Date(r.date_format.unwrap_or_default())
                    }
                    EmergencyReturning::NumberOfMatchesInPeriod => EventOutput::Count,
                };
                self.warn_unused_format(name, r.date_format, output);
                let query = EventQuery {
                    source: EventSource::EmergencyCare,
                    codelist: None,
                    window: window?,
                    selection: selection?,
                    output,
                };
                Some((CompiledRule::Events(query), None))
            }
            Rule::GpConsultations(r) => {
                let window = self.window(name, &r.window)?;
                let output = match r.returning {
                    ConsultationReturning::BinaryFlag => EventOutput::BinaryFlag,
                    ConsultationReturning::NumberOfMatchesInPeriod => EventOutput::Count,
                };
                let query = EventQuery {
                    source: EventSource::GpConsultations,
                    codelist: None,
                    window,
                    selection: Selection::Last,
                    output,
                };
                Some((CompiledRule::Events(query), None))
            }
            Rule::DiedFromAnyCause(r) => {
                let window = self.window(name, &r.window)?;
                Some((
                    CompiledRule::Death {
                        causes: None,
                        underlying_only: false,
                        window,
                        output: death_output(r.returning, r.date_format),
                    },
                    None,
                ))
            }
            Rule::DeathCertificate(r) => {
                let causes = self.codelist(name, &r.codelist, DIAGNOSIS_SYSTEMS);
                let window = self.window(name, &r.window);
                Some((
                    CompiledRule::Death {
                        causes: Some(causes?),
                        underlying_only: r.match_only_underlying_cause,
                        window: window?,
                        output: death_output(r.returning, r.date_format),
                    },
                    None,
                ))
            }
            Rule::MostRecentBmi(r) => {
                let window = self.window(name, &r.window)?;
                let date_column = r.include_measurement_date.then(|| DerivedColumn {
                    name: format!("{}_date_measured", name),
                    format: r.date_format.unwrap_or_default(),
                });
                Some((
                    CompiledRule::Bmi {
                        window,
                        minimum_age: r.minimum_age_at_measurement,
                    },
                    date_column,
                ))
            }
            Rule::AgeAsOf { date } => {
                let as_of = self.date(name, date)?;
                Some((CompiledRule::Age { as_of }, None))
            }
            Rule::Sex => Some((CompiledRule::Sex, None)),
            Rule::RegisteredAsOf { date } => {
                let as_of = self.date(name, date)?;
                Some((CompiledRule::Registered { as_of }, None))
            }
            Rule::RegisteredPracticeAsOf { date, returning } => {
                let as_of = self.date(name, date)?;
                Some((
                    CompiledRule::Practice {
                        as_of,
                        attribute: *returning,
                    },
                    None,
                ))
            }
            Rule::AddressAsOf {
                date,
                returning,
                round_to_nearest,
            } => {
                let as_of = self.date(name, date);
                if *round_to_nearest == Some(0) {
                    self.error(COH0117, name, "round_to_nearest must be positive".to_string());
                    return None;
                }
                Some((
                    CompiledRule::Address {
                        as_of: as_of?,
                        attribute: *returning,
                        round_to_nearest: *round_to_nearest,
                    },
                    None,
                ))
            }
            Rule::CareHomeStatusAsOf {
                date,
                categorised_as,
            } => {
                let as_of = self.date(name, date);
                let table = self.category_table(name, categorised_as);
                if let Some(table) = &table {
                    for (_, predicate) in &table.rules {
                        for ident in predicate.identifiers() {
                            if !CARE_HOME_ATTRIBUTES.contains(&ident) {
                                self.error(
                                    COH0100,
                                    name,
                                    format!("Unknown care-home attribute '{}'", ident),
                                );
                            }
                        }
                    }
                }
                Some((
                    CompiledRule::CareHome {
                        as_of: as_of?,
                        table: table?,
                    },
                    None,
                ))
            }
            Rule::CategorisedAs(categorisation) => {
                let table = self.category_table(name, &categorisation.categories)?;
                Some((CompiledRule::Categorised(table), None))
            }
        }
    }

    fn date(&mut self, subject: &str, text: &str) -> Option<DateExpr> {
        match parse_date_expr(text) {
            Ok(expr) => {
                if expr.anchor == DateAnchor::IndexDate && self.index_date.is_none() {
                    self.error(
                        COH0111,
                        subject,
                        format!("'{}' uses index_date but the study has none", text),
                    );
                    return None;
                }
                Some(expr)
            }
            Err(err) => {
                self.errors.push(in_subject(err, subject));
                None
            }
        }
    }

    fn window(&mut self, subject: &str, window: &TimeWindow) -> Option<DateWindow> {
        let start = window
            .on_or_after
            .as_deref()
            .map(|text| self.date(subject, text));
        let end = window
            .on_or_before
            .as_deref()
            .map(|text| self.date(subject, text));

        let window = DateWindow {
            start: start.map_or(Some(None), |s| s.map(Some))?,
            end: end.map_or(Some(None), |e| e.map(Some))?,
        };
        if let (Some(start), Some(end)) = (&window.start, &window.end) {
            if self.statically_reversed(start, end) {
                self.error(
                    COH0112,
                    subject,
                    format!("Window starts at '{}' which is after its end '{}'", start, end),
                );
                return None;
            }
        }
        Some(window)
    }

    /// Whether a window's start is provably after its end
    fn statically_reversed(&self, start: &DateExpr, end: &DateExpr) -> bool {
        let concrete = |expr: &DateExpr| match &expr.anchor {
            DateAnchor::Literal(date) => expr.shift(*date),
            DateAnchor::IndexDate => self.index_date.and_then(|d| expr.shift(d)),
            DateAnchor::Today | DateAnchor::Variable(_) => None,
        };
        if let (Some(s), Some(e)) = (concrete(start), concrete(end)) {
            return s > e;
        }
        if start.anchor != end.anchor {
            return false;
        }
        let steps = |expr: &DateExpr| {
            expr.offset
                .map(|o| o.as_months_and_days())
                .unwrap_or((0, 0))
        };
        let (start_months, start_days) = steps(start);
        let (end_months, end_days) = steps(end);
        if start_months == end_months {
            start_days > end_days
        } else if start_days == end_days {
            start_months > end_months
        } else {
            false
        }
    }

    fn codelist(
        &mut self,
        subject: &str,
        name: &str,
        allowed: &[CodingSystem],
    ) -> Option<Arc<Codelist>> {
        let list = match self.registry.require(name) {
            Ok(list) => list,
            Err(_) => {
                self.error(COH0101, subject, format!("Undefined codelist '{}'", name));
                return None;
            }
        };
        if !allowed.contains(&list.system()) {
            let expected: Vec<&str> = allowed.iter().map(|s| s.display_name()).collect();
            self.error(
                COH0113,
                subject,
                format!(
                    "Codelist '{}' is {} but this rule needs {}",
                    name,
                    list.system().display_name(),
                    expected.join(" or ")
                ),
            );
            return None;
        }
        if !self.used_codelists.iter().any(|(used, _)| used == name) {
            self.used_codelists
                .push((name.to_string(), subject.to_string()));
        }
        Some(list)
    }

    fn selection(
        &mut self,
        subject: &str,
        selection: MatchSelection,
        value_returning: bool,
    ) -> Option<Selection> {
        match (
            selection.find_first_match_in_period,
            selection.find_last_match_in_period,
        ) {
            (true, true) => {
                self.error(
                    COH0105,
                    subject,
                    "Both first and last match requested".to_string(),
                );
                None
            }
            (true, false) => Some(Selection::First),
            (false, true) => Some(Selection::Last),
            (false, false) if value_returning => {
                self.error(
                    COH0106,
                    subject,
                    "Rule returns a value but does not say which match to use".to_string(),
                );
                None
            }
            (false, false) => Some(Selection::Last),
        }
    }

    fn date_of_match(
        &mut self,
        subject: &str,
        returning: EventReturning,
        date_of_match: &DateOfMatch,
    ) -> Option<DerivedColumn> {
        if !date_of_match.include_date_of_match {
            return None;
        }
        if returning == EventReturning::Date {
            self.error(
                COH0109,
                subject,
                "include_date_of_match cannot be combined with returning a date".to_string(),
            );
            return None;
        }
        if date_of_match.include_day && !date_of_match.include_month {
            self.error(
                COH0109,
                subject,
                "include_day requires include_month".to_string(),
            );
            return None;
        }
        Some(DerivedColumn {
            name: format!("{}_date", subject),
            format: DateFormat::from_precision(date_of_match.include_month, date_of_match.include_day),
        })
    }

    fn warn_unused_format(&mut self, subject: &str, format: Option<DateFormat>, output: EventOutput) {
        if format.is_some() && !matches!(output, EventOutput::Date(_)) {
            self.warnings.push(
                Diagnostic::warning(COH0109, "date_format has no effect on a non-date column")
                    .with_subject(subject),
            );
        }
    }

    fn category_table(&mut self, subject: &str, categories: &[Category]) -> Option<CategoryTable> {
        let mut rules = Vec::new();
        let mut default_label: Option<String> = None;
        let mut labels = HashSet::new();
        let mut ok = true;

        for category in categories {
            if !labels.insert(category.label.as_str()) {
                self.error(
                    COH0108,
                    subject,
                    format!("Category '{}' is listed twice", category.label),
                );
                ok = false;
                continue;
            }
            match parse_predicate(&category.predicate) {
                Ok(Expression::Default) => {
                    if default_label.is_some() {
                        self.error(COH0108, subject, "More than one DEFAULT category".to_string());
                        ok = false;
                    } else {
                        default_label = Some(category.label.clone());
                    }
                }
                Ok(predicate) => rules.push((category.label.clone(), predicate)),
                Err(err) => {
                    self.errors.push(in_subject(err, subject));
                    ok = false;
                }
            }
        }

        let Some(default_label) = default_label else {
            self.error(COH0107, subject, "Categorisation has no DEFAULT".to_string());
            return None;
        };
        ok.then_some(CategoryTable {
            rules,
            default_label,
        })
    }

    fn population(&mut self, positions: &HashMap<&str, usize>) -> Option<Expression> {
        let study = self.study;
        let Some(text) = &study.population else {
            self.error(COH0110, POPULATION, "Study has no population".to_string());
            return None;
        };
        let expr = match parse_predicate(text) {
            Ok(expr) => expr,
            Err(err) => {
                self.errors.push(in_subject(err, POPULATION));
                return None;
            }
        };
        let mut ok = true;
        for ident in expr.identifiers() {
            if !positions.contains_key(ident) {
                self.error(COH0100, POPULATION, format!("Undefined variable '{}'", ident));
                ok = false;
            }
        }
        ok.then_some(expr)
    }

    /// Derived date columns must not collide with declared names
    fn check_columns(&mut self, compiled: &[Option<CompiledVariable>]) {
        let study = self.study;
        let declared: HashSet<&str> = study
            .flattened()
            .into_iter()
            .map(|(d, _)| d.name.as_str())
            .collect();
        for variable in compiled.iter().flatten() {
            if let Some(column) = &variable.date_column {
                if declared.contains(column.name.as_str()) {
                    self.error(
                        COH0102,
                        &variable.name,
                        format!("Date column '{}' clashes with a variable", column.name),
                    );
                }
            }
        }
    }

    fn check_measures(&mut self, declarations: &[(&VariableDecl, bool)]) {
        let outputs: HashSet<&str> = declarations
            .iter()
            .filter(|(_, hidden)| !hidden)
            .map(|(d, _)| d.name.as_str())
            .collect();
        let mut ids = HashSet::new();

        let study = self.study;
        for measure in &study.measures {
            let id = measure.id.as_str();
            if !ids.insert(id) {
                self.error(COH0116, id, format!("Measure id '{}' is used twice", id));
            }
            if !outputs.contains(measure.numerator.as_str()) {
                self.error(
                    COH0115,
                    id,
                    format!("Numerator '{}' is not a study variable", measure.numerator),
                );
            }
            if measure.denominator != POPULATION && !outputs.contains(measure.denominator.as_str()) {
                self.error(
                    COH0115,
                    id,
                    format!("Denominator '{}' is not a study variable", measure.denominator),
                );
            }
            if measure.group_by.is_empty() {
                self.error(COH0115, id, "group_by names no columns".to_string());
            }
            for column in measure.group_columns() {
                if !outputs.contains(column) {
                    self.error(
                        COH0115,
                        id,
                        format!("Group-by column '{}' is not a study variable", column),
                    );
                }
            }
        }
    }

    fn check_expectations(&mut self, declarations: &[(&VariableDecl, bool)]) {
        let study = self.study;
        let hints = std::iter::once((&study.default_expectations, "default_expectations")).chain(
            declarations
                .iter()
                .map(|(decl, _)| (&decl.return_expectations, decl.name.as_str())),
        );
        for (hints, subject) in hints {
            let (errors, warnings): (Vec<CohortError>, Vec<Diagnostic>) = hints.validate(subject);
            self.errors.extend(errors);
            self.warnings.extend(warnings);
        }
    }

    fn codelist_warnings(&mut self) {
        for (name, first_user) in &self.used_codelists {
            let Some(list) = self.registry.get(name) else {
                continue;
            };
            if let Some(flag) = list.quality_flag() {
                log::warn!("codelist '{}' used by '{}': {}", name, first_user, flag);
                self.warnings.push(
                    Diagnostic::warning(COH0310, flag.to_string())
                        .with_subject(name.clone())
                        .with_help(format!("used by '{}'", first_user)),
                );
            }
        }
    }
}

fn death_output(returning: DeathReturning, format: Option<DateFormat>) -> DeathOutput {
    match returning {
        DeathReturning::BinaryFlag => DeathOutput::BinaryFlag,
        DeathReturning::DateOfDeath => DeathOutput::Date(format.unwrap_or_default()),
    }
}

/// Variables a compiled rule reads, in order of first use
fn rule_dependencies(rule: &CompiledRule) -> Vec<String> {
    let names: Vec<&str> = match rule {
        CompiledRule::Events(query) => query.window.variables(),
        CompiledRule::Death { window, .. } | CompiledRule::Bmi { window, .. } => window.variables(),
        CompiledRule::Age { as_of }
        | CompiledRule::Registered { as_of }
        | CompiledRule::Practice { as_of, .. }
        | CompiledRule::Address { as_of, .. }
        | CompiledRule::CareHome { as_of, .. } => as_of.referenced_variable().into_iter().collect(),
        CompiledRule::Sex => Vec::new(),
        CompiledRule::Categorised(table) => {
            let mut names: Vec<&str> = Vec::new();
            for (_, predicate) in &table.rules {
                for ident in predicate.identifiers() {
                    if !names.contains(&ident) {
                        names.push(ident);
                    }
                }
            }
            names
        }
    };
    names.into_iter().map(str::to_string).collect()
}

/// Kahn's algorithm, always taking the earliest-declared ready variable.
///
/// On failure returns the variables that could not be ordered.
fn topological_order(variables: &[CompiledVariable]) -> std::result::Result<Vec<usize>, Vec<usize>> {
    let index: HashMap<&str, usize> = variables
        .iter()
        .enumerate()
        .map(|(i, v)| (v.name.as_str(), i))
        .collect();

    let mut indegree = vec![0usize; variables.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); variables.len()];
    for (i, variable) in variables.iter().enumerate() {
        for dependency in &variable.dependencies {
            if let Some(&d) = index.get(dependency.as_str()) {
                indegree[i] += 1;
                dependents[d].push(i);
            }
        }
    }

    let mut ready: BTreeSet<usize> = (0..variables.len()).filter(|&i| indegree[i] == 0).collect();
    let mut order = Vec::with_capacity(variables.len());
    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &dependent in &dependents[next] {
            indegree[dependent] -= 1;
            if indegree[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() == variables.len() {
        Ok(order)
    } else {
        Err((0..variables.len()).filter(|&i| indegree[i] > 0).collect())
    }
}

/// Visible variables in declaration order, each followed by its date column
fn output_columns(variables: &[CompiledVariable]) -> Vec<String> {
    let mut columns = Vec::new();
    for variable in variables.iter().filter(|v| !v.hidden) {
        columns.push(variable.name.clone());
        if let Some(column) = &variable.date_column {
            columns.push(column.name.clone());
        }
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::patients;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_topological_order_is_stable() {
        let study = StudyDefinition::new("t")
            .population("a")
            .variable("a", patients::sex())
            .variable("b", patients::age_as_of("2020-01-01"))
            .variable("c", patients::registered_as_of("2020-01-01"));
        let compiled = compile(&study, &CodelistRegistry::new()).unwrap();
        assert_eq!(compiled.resolution_order(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_reversed_window_on_same_anchor() {
        let study = StudyDefinition::default();
        let registry = CodelistRegistry::new();
        let compiler = Compiler::new(&study, &registry);
        let start = parse_date_expr("ca_date + 6 months").unwrap();
        let end = parse_date_expr("ca_date").unwrap();
        assert!(compiler.statically_reversed(&start, &end));
        let start = parse_date_expr("ca_date - 1 years").unwrap();
        assert!(!compiler.statically_reversed(&start, &end));
        let start = parse_date_expr("ca_date + 1 months").unwrap();
        let end = parse_date_expr("ca_date + 20 days").unwrap();
        assert!(!compiler.statically_reversed(&start, &end));
    }
}
