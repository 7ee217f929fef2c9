//! Single-file pass: read a chain CSV, append implied volatility and Greeks.
//!
//! Output shape per line is the input line with its last character replaced
//! by `,`, followed by the new columns. Rows are handled as field records
//! rather than raw text: the fix-up drops the last character of the final
//! field, or the final field itself when it is empty (a trailing comma).
//! Fields are kept as raw bytes, so pass-through columns need not be UTF-8.
//!
//! A quote no volatility can reproduce gets `NaN` in all six new columns.
//! Values too small or too large for plain decimals are written in exponent
//! form (`1.5e-200`).

use std::fs::File;
use std::io::{Read, Write};

use csv::{ByteRecord, QuoteStyle, ReaderBuilder, Terminator, WriterBuilder};
use tracing::debug;

use crate::calendar::time_to_expiry_years;
use crate::config::BatchConfig;
use crate::data::{OptionRow, OptionType};
use crate::error::{BatchError, BatchResult};
use crate::pricing::PricingClient;

use super::scanner::FileJob;

/// Column names appended to the header, in output order.
pub const GREEKS_COLUMNS: [&str; 6] = [
    "ImpliedVolatility",
    "Delta",
    "Gamma",
    "Vega",
    "Theta",
    "Rho",
];

/// Result of one file pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileStats {
    /// Data rows written (header excluded).
    pub rows: usize,
}

/// Plain decimals are used for magnitudes in this range, exponent form outside.
const PLAIN_MIN_EXPONENT: i32 = -5;
const PLAIN_MAX_EXPONENT: i32 = 16;

/// An input record after the trailing-artifact fix-up, plus appended columns.
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentedRow {
    pub base: Vec<Vec<u8>>,
    pub extra: Vec<String>,
}

impl AugmentedRow {
    pub fn new<I, S>(record: &ByteRecord, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            base: strip_trailing_artifact(record),
            extra: extra.into_iter().map(Into::into).collect(),
        }
    }

    /// Header row: the input header plus [`GREEKS_COLUMNS`].
    pub fn header(record: &ByteRecord) -> Self {
        Self::new(record, GREEKS_COLUMNS)
    }

    pub fn fields(&self) -> impl Iterator<Item = &[u8]> {
        self.base
            .iter()
            .map(Vec::as_slice)
            .chain(self.extra.iter().map(String::as_bytes))
    }

    /// The serialized line, without terminator.
    pub fn to_line(&self) -> Vec<u8> {
        self.fields().collect::<Vec<_>>().join(&b',')
    }
}

/// Text for one appended value.
pub fn format_value(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return value.to_string();
    }
    let exponent = value.abs().log10().floor() as i32;
    if (PLAIN_MIN_EXPONENT..PLAIN_MAX_EXPONENT).contains(&exponent) {
        value.to_string()
    } else {
        format!("{:e}", value)
    }
}

/// Drop the last character of a record's serialized form.
///
/// Chain files end each line with a separator artifact (`\r` or a trailing
/// `,`); the output re-adds a `,` before the appended columns.
pub fn strip_trailing_artifact(record: &ByteRecord) -> Vec<Vec<u8>> {
    let mut fields: Vec<Vec<u8>> = record.iter().map(<[u8]>::to_vec).collect();
    // An empty final field means the artifact was the separator itself.
    if fields.last().is_some_and(|f| f.is_empty()) {
        fields.pop();
    } else if let Some(last) = fields.last_mut() {
        last.pop();
    }
    fields
}

/// Computes the extra columns for every row of one file.
pub struct FileTransformer<'a, P: PricingClient + ?Sized> {
    pricer: &'a P,
    config: &'a BatchConfig,
}

impl<'a, P: PricingClient + ?Sized> FileTransformer<'a, P> {
    pub fn new(pricer: &'a P, config: &'a BatchConfig) -> Self {
        Self { pricer, config }
    }

    /// Transform `job.input` into `job.output`.
    ///
    /// Fails with [`BatchError::Io`] if either file cannot be opened. The
    /// output is created (and truncated) only after the input opened.
    pub fn transform(&self, job: &FileJob) -> BatchResult<FileStats> {
        let input = File::open(&job.input).map_err(|e| BatchError::io(&job.input, e))?;
        let output = File::create(&job.output).map_err(|e| BatchError::io(&job.output, e))?;

        let stats = self.transform_stream(input, output)?;
        debug!(
            "Wrote {} rows to {}",
            stats.rows,
            job.output.display()
        );
        Ok(stats)
    }

    /// Transform CSV text from `input` into `output`.
    ///
    /// Rows are written in input order. The first bad row aborts the pass;
    /// rows before it have already been written, nothing after it is.
    pub fn transform_stream<R: Read, W: Write>(
        &self,
        input: R,
        output: W,
    ) -> BatchResult<FileStats> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .terminator(Terminator::Any(b'\n'))
            .from_reader(input);
        let mut writer = WriterBuilder::new()
            .flexible(true)
            .quote_style(QuoteStyle::Never)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(output);

        let mut records = reader.byte_records();
        let header = match records.next() {
            Some(record) => record?,
            None => ByteRecord::new(),
        };
        writer.write_record(AugmentedRow::header(&header).fields())?;

        let mut stats = FileStats::default();
        for record in records {
            let row = OptionRow::from_record(record?)?;
            writer.write_record(self.augment(&row).fields())?;
            stats.rows += 1;
        }

        writer.flush().map_err(csv::Error::from)?;
        Ok(stats)
    }

    /// Price one row and build its output record.
    pub fn augment(&self, row: &OptionRow) -> AugmentedRow {
        let rate = self.config.risk_free_rate;
        let time = time_to_expiry_years(row.days_to_expiry(), self.config.day_count_basis);
        let price = row.market_price();

        let (iv, greeks) = match row.option_type {
            OptionType::Call => {
                let iv = self
                    .pricer
                    .implied_volatility_call(row.spot, row.strike, rate, time, price);
                (iv, self.pricer.partials_call(row.spot, row.strike, rate, iv, time))
            }
            OptionType::Put => {
                let iv = self
                    .pricer
                    .implied_volatility_put(row.spot, row.strike, rate, time, price);
                (iv, self.pricer.partials_put(row.spot, row.strike, rate, iv, time))
            }
        };

        let values = [
            100.0 * iv,
            greeks.delta,
            greeks.gamma,
            greeks.vega,
            greeks.theta,
            greeks.rho,
        ];
        AugmentedRow::new(&row.record, values.iter().copied().map(format_value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::stub::{PricingCall, RecordingPricer};
    use crate::pricing::BlackScholesPricer;
    use approx::assert_relative_eq;

    const HEADER: &str = "underlying,underlying_last,exchange,optionroot,optionext,type,expiration,quotedate,strike,last,bid,ask,volume,";

    fn run_with<P: PricingClient>(pricer: &P, input: &str) -> (BatchResult<FileStats>, String) {
        let config = BatchConfig::default();
        let transformer = FileTransformer::new(pricer, &config);
        let mut output = Vec::new();
        let result = transformer.transform_stream(input.as_bytes(), &mut output);
        (result, String::from_utf8(output).unwrap())
    }

    fn row(option_type: &str, bid: &str, ask: &str) -> String {
        format!(
            "SPY,100.00,*,SPY200131C00100000,,{},01/31/2020,01/01/2020,100,5.05,{},{},12,",
            option_type, bid, ask
        )
    }

    #[test]
    fn test_strip_trailing_artifact() {
        let fields = |line: &str| {
            strip_trailing_artifact(&ByteRecord::from(line.split(',').collect::<Vec<_>>()))
        };
        assert_eq!(fields("a,b,"), vec![b"a".to_vec(), b"b".to_vec()]);
        assert_eq!(fields("a,b\r"), vec![b"a".to_vec(), b"b".to_vec()]);
        assert_eq!(fields("a,bc"), vec![b"a".to_vec(), b"b".to_vec()]);
        assert_eq!(fields("a,x"), vec![b"a".to_vec(), Vec::new()]);
        assert!(strip_trailing_artifact(&ByteRecord::new()).is_empty());
    }

    #[test]
    fn test_header_augmentation() {
        for header in ["a,b,c,", "a,b,c\r", "a,b,cX"] {
            let record = ByteRecord::from(header.split(',').collect::<Vec<_>>());
            let line = String::from_utf8(AugmentedRow::header(&record).to_line()).unwrap();
            let expected = format!(
                "{},ImpliedVolatility,Delta,Gamma,Vega,Theta,Rho",
                &header[..header.len() - 1]
            );
            assert_eq!(line, expected);
        }
    }

    #[test]
    fn test_header_only_file() {
        let pricer = RecordingPricer::default();
        let (result, output) = run_with(&pricer, &format!("{}\n", HEADER));
        assert_eq!(result.unwrap().rows, 0);
        assert_eq!(
            output,
            format!("{}ImpliedVolatility,Delta,Gamma,Vega,Theta,Rho\n", HEADER)
        );
        assert!(pricer.calls().is_empty());
    }

    #[test]
    fn test_call_dispatch() {
        let pricer = RecordingPricer::default();
        let input = format!("{}\n{}\n", HEADER, row("call", "5.00", "5.20"));
        let (result, output) = run_with(&pricer, &input);
        assert_eq!(result.unwrap().rows, 1);

        let calls = pricer.calls();
        assert_eq!(calls.len(), 2);
        match calls[0] {
            PricingCall::ImpliedVolCall { spot, strike, rate, time, market_price } => {
                assert_eq!(spot, 100.0);
                assert_eq!(strike, 100.0);
                assert_eq!(rate, 0.01);
                assert_relative_eq!(time, 30.0 / 365.0, epsilon = 1e-12);
                assert_relative_eq!(market_price, 5.10, epsilon = 1e-12);
            }
            ref other => panic!("expected call solver, got {:?}", other),
        }
        match calls[1] {
            PricingCall::PartialsCall { volatility, time, .. } => {
                assert_eq!(volatility, RecordingPricer::VOL);
                assert_relative_eq!(time, 30.0 / 365.0, epsilon = 1e-12);
            }
            ref other => panic!("expected call partials, got {:?}", other),
        }

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        let expected_prefix = "SPY,100.00,*,SPY200131C00100000,,call,01/31/2020,01/01/2020,100,5.05,5.00,5.20,12,";
        assert!(lines[1].starts_with(expected_prefix));

        // IV%, delta, gamma, vega, theta, rho
        let extra: Vec<f64> = lines[1][expected_prefix.len()..]
            .split(',')
            .map(|v| v.parse().unwrap())
            .collect();
        let g = RecordingPricer::GREEKS;
        assert_eq!(
            extra,
            vec![100.0 * RecordingPricer::VOL, g.delta, g.gamma, g.vega, g.theta, g.rho]
        );
    }

    #[test]
    fn test_put_dispatch() {
        let pricer = RecordingPricer::default();
        let input = format!("{}\n{}\n", HEADER, row("put", "1.00", "1.50"));
        run_with(&pricer, &input).0.unwrap();

        let calls = pricer.calls();
        assert!(matches!(calls[0], PricingCall::ImpliedVolPut { .. }));
        assert!(matches!(calls[1], PricingCall::PartialsPut { .. }));
    }

    #[test]
    fn test_row_order_preserved() {
        let pricer = RecordingPricer::default();
        let mut input = format!("{}\n", HEADER);
        for i in 0..20 {
            let opt = if i % 3 == 0 { "put" } else { "call" };
            input.push_str(&row(opt, &format!("{}.00", i), &format!("{}.50", i)));
            input.push('\n');
        }

        let (result, output) = run_with(&pricer, &input);
        assert_eq!(result.unwrap().rows, 20);

        for (i, line) in output.lines().skip(1).enumerate() {
            let fields: Vec<&str> = line.split(',').collect();
            assert_eq!(fields[10], format!("{}.00", i));
            assert_eq!(fields[11], format!("{}.50", i));
        }
    }

    #[test]
    fn test_unknown_type_aborts() {
        let pricer = RecordingPricer::default();
        let input = format!(
            "{}\n{}\n{}\n{}\n",
            HEADER,
            row("call", "5.00", "5.20"),
            row("straddle", "5.00", "5.20"),
            row("put", "5.00", "5.20"),
        );

        let (result, output) = run_with(&pricer, &input);
        let err = result.unwrap_err();
        assert_eq!(err.exit_code(), -3);
        assert!(matches!(err, BatchError::UnknownOptionType { line: 3, .. }));

        // Header and the first row only.
        assert_eq!(output.lines().count(), 2);
        assert!(!output.contains("straddle"));
        assert!(!output.contains(",put,"));
        assert_eq!(pricer.calls().len(), 2);
    }

    #[test]
    fn test_crlf_input() {
        let pricer = RecordingPricer::default();
        let header = HEADER.trim_end_matches(',');
        let data = row("call", "5.00", "5.20");
        let data = data.trim_end_matches(',');
        let input = format!("{}\r\n{}\r\n", header, data);

        let (result, output) = run_with(&pricer, &input);
        result.unwrap();

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines[0],
            format!("{},ImpliedVolatility,Delta,Gamma,Vega,Theta,Rho", header)
        );
        assert!(lines[1].starts_with(&format!("{},", data)));
        assert!(!output.contains('\r'));
    }

    #[test]
    fn test_quotes_pass_through() {
        let pricer = RecordingPricer::default();
        let input = format!(
            "{}\n{}\n",
            HEADER,
            row("call", "5.00", "5.20").replace("*", "\"x\"")
        );
        let (result, output) = run_with(&pricer, &input);
        result.unwrap();
        assert!(output.lines().nth(1).unwrap().starts_with("SPY,100.00,\"x\","));
    }

    #[test]
    fn test_short_row_is_parse_error() {
        let pricer = RecordingPricer::default();
        let input = format!("{}\nSPY,100.00,*\n", HEADER);
        let err = run_with(&pricer, &input).0.unwrap_err();
        assert!(matches!(err, BatchError::Parse(_)));
        assert_eq!(err.exit_code(), -3);
    }

    #[test]
    fn test_rate_from_config() {
        let pricer = RecordingPricer::default();
        let config = BatchConfig::default().with_rate(0.04);
        let transformer = FileTransformer::new(&pricer, &config);
        let input = format!("{}\n{}\n", HEADER, row("call", "5.00", "5.20"));
        transformer
            .transform_stream(input.as_bytes(), Vec::<u8>::new())
            .unwrap();

        match pricer.calls()[0] {
            PricingCall::ImpliedVolCall { rate, .. } => assert_eq!(rate, 0.04),
            ref other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_black_scholes_end_to_end_row() {
        let pricer = BlackScholesPricer::default();
        let input = format!("{}\n{}\n", HEADER, row("call", "2.50", "2.60"));
        let (result, output) = run_with(&pricer, &input);
        result.unwrap();

        let line = output.lines().nth(1).unwrap();
        let fields: Vec<&str> = line.split(',').collect();
        let n = fields.len();
        let iv_pct: f64 = fields[n - 6].parse().unwrap();
        let delta: f64 = fields[n - 5].parse().unwrap();

        // ATM one-month call at 2.55 is roughly 21.5 vol
        assert!(iv_pct > 15.0 && iv_pct < 30.0, "iv {}", iv_pct);
        assert!(delta > 0.45 && delta < 0.6, "delta {}", delta);
    }

    #[test]
    fn test_non_utf8_passthrough_bytes_preserved() {
        let pricer = RecordingPricer::default();
        let data = row("call", "5.00", "5.20").replace('*', "\u{0}");
        let mut input = format!("{}\n{}\n", HEADER, data).into_bytes();
        let pos = input.iter().position(|&b| b == 0).unwrap();
        input[pos] = 0xE9;

        let config = BatchConfig::default();
        let transformer = FileTransformer::new(&pricer, &config);
        let mut output = Vec::new();
        let stats = transformer.transform_stream(&input[..], &mut output).unwrap();
        assert_eq!(stats.rows, 1);

        let line = output.split(|&b| b == b'\n').nth(1).unwrap();
        assert!(line.starts_with(b"SPY,100.00,\xE9,SPY200131C00100000,"));
        assert_eq!(pricer.calls().len(), 2);
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(0.5), "0.5");
        assert_eq!(format_value(-12.5), "-12.5");
        assert_eq!(format_value(0.0), "0");
        assert_eq!(format_value(f64::NAN), "NaN");
        assert_eq!(format_value(1.5e-200), "1.5e-200");
        assert_eq!(format_value(-2e20), "-2e20");
        assert_eq!(format_value(0.00012), "0.00012");

        let tiny: f64 = format_value(3.25e-150).parse().unwrap();
        assert_eq!(tiny, 3.25e-150);
    }
}
