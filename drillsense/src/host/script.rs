//! Line-protocol host bridge.
//!
//! When the builder runs as a script launched by the CAM host, the host reads
//! requests from the script's stdout and answers on its stdin. Every request
//! is one line starting with [`REQUEST_PREFIX`]:
//!
//! ```text
//! @%#%@COM add_pad,attributes=no,x=0.09,...       -> <status>\n<answer>\n
//! @%#%@DO_INFO -t step -e job1/cpn -d EXISTS      -> <status>\nyes\n
//! @%#%@DO_INFO -t matrix -e job1/matrix -d ROW    -> <status>\n<n>\n<row>\n...
//! ```
//!
//! A status other than `0` fails the request. Matrix rows are tab separated:
//! `row name type context polarity drl_start drl_end`.

use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};

use super::{CamHost, Command, HostError, Limits};
use crate::matrix::{LayerContext, LayerType, MatrixRow, Polarity};

pub const REQUEST_PREFIX: &str = "@%#%@";

/// A bidirectional line channel to the host
pub trait Transport {
    fn send(&mut self, line: &str) -> io::Result<()>;

    /// Next reply line without its line terminator.
    fn receive(&mut self) -> io::Result<String>;
}

/// Transport over any reader/writer pair
pub struct LineTransport<R, W> {
    reader: R,
    writer: W,
}

pub type StdioTransport = LineTransport<BufReader<Stdin>, Stdout>;

impl StdioTransport {
    pub fn stdio() -> Self {
        LineTransport::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R: BufRead, W: Write> LineTransport<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }
}

impl<R: BufRead, W: Write> Transport for LineTransport<R, W> {
    fn send(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.writer, "{}", line)?;
        self.writer.flush()
    }

    fn receive(&mut self) -> io::Result<String> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "host closed the connection",
            ));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// [`CamHost`] that forwards everything to the real host.
pub struct ScriptHost<T: Transport> {
    transport: T,
    job: String,
}

impl<T: Transport> ScriptHost<T> {
    pub fn new(transport: T, job: impl Into<String>) -> Self {
        Self {
            transport,
            job: job.into(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn request(&mut self, kind: &str, body: &str) -> Result<String, HostError> {
        let line = format!("{}{} {}", REQUEST_PREFIX, kind, body);
        self.transport.send(&line)?;

        let status_line = self.transport.receive()?;
        let status: i32 = status_line.trim().parse().map_err(|_| {
            HostError::Protocol(format!("Expected status, got {:?}", status_line))
        })?;
        let answer = self.transport.receive()?;

        if status != 0 {
            return Err(HostError::CommandFailed {
                status,
                command: body.to_string(),
            });
        }
        Ok(answer)
    }

    fn info(&mut self, entity_type: &str, entity: &str, data: &str) -> Result<String, HostError> {
        let body = format!("-t {} -e {} -d {}", entity_type, entity, data);
        self.request("DO_INFO", &body)
    }

    fn yes_no(answer: &str) -> Result<bool, HostError> {
        match answer.trim() {
            "yes" => Ok(true),
            "no" => Ok(false),
            other => Err(HostError::Protocol(format!("Expected yes/no, got {:?}", other))),
        }
    }
}

impl<T: Transport> CamHost for ScriptHost<T> {
    fn execute(&mut self, command: Command) -> Result<(), HostError> {
        let line = command.to_string();
        tracing::trace!("COM {}", line);
        self.request("COM", &line).map(|_| ())
    }

    fn step_exists(&mut self, step: &str) -> Result<bool, HostError> {
        let entity = format!("{}/{}", self.job, step);
        let answer = self.info("step", &entity, "EXISTS")?;
        Self::yes_no(&answer)
    }

    fn layer_exists(&mut self, layer: &str) -> Result<bool, HostError> {
        let entity = format!("{}/{}", self.job, layer);
        let answer = self.info("layer", &entity, "EXISTS")?;
        Self::yes_no(&answer)
    }

    fn layer_polarity(&mut self, layer: &str) -> Result<Polarity, HostError> {
        let entity = format!("{}/{}", self.job, layer);
        let answer = self.info("layer", &entity, "POLARITY")?;
        Polarity::from_keyword(answer.trim())
            .ok_or_else(|| HostError::Protocol(format!("Unknown polarity {:?}", answer)))
    }

    fn step_limits(&mut self, step: &str) -> Result<Limits, HostError> {
        let entity = format!("{}/{}", self.job, step);
        let answer = self.info("step", &entity, "LIMITS")?;
        parse_limits(&answer)
    }

    fn matrix_rows(&mut self) -> Result<Vec<MatrixRow>, HostError> {
        let entity = format!("{}/matrix", self.job);
        let answer = self.info("matrix", &entity, "ROW")?;
        let count: usize = answer.trim().parse().map_err(|_| {
            HostError::Protocol(format!("Expected row count, got {:?}", answer))
        })?;

        let mut rows = Vec::with_capacity(count);
        for _ in 0..count {
            let line = self.transport.receive()?;
            rows.push(parse_row(&line)?);
        }
        Ok(rows)
    }

    fn job_name(&self) -> &str {
        &self.job
    }
}

/// Parse `xmin ymin xmax ymax`.
pub fn parse_limits(answer: &str) -> Result<Limits, HostError> {
    let values: Vec<f64> = answer
        .split_whitespace()
        .map(|v| v.parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| HostError::Protocol(format!("Bad limits {:?}: {}", answer, e)))?;

    match values.as_slice() {
        [xmin, ymin, xmax, ymax] => Ok(Limits {
            xmin: *xmin,
            ymin: *ymin,
            xmax: *xmax,
            ymax: *ymax,
        }),
        _ => Err(HostError::Protocol(format!("Bad limits {:?}", answer))),
    }
}

/// Parse one tab-separated matrix row.
pub fn parse_row(line: &str) -> Result<MatrixRow, HostError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != 7 {
        return Err(HostError::Protocol(format!(
            "Matrix row needs 7 fields, got {}: {:?}",
            fields.len(),
            line
        )));
    }

    let bad = |what: &str, value: &str| HostError::Protocol(format!("Unknown {} {:?}", what, value));
    Ok(MatrixRow {
        row: fields[0].parse().map_err(|_| bad("row number", fields[0]))?,
        name: fields[1].to_string(),
        layer_type: LayerType::from_keyword(fields[2]).ok_or_else(|| bad("layer type", fields[2]))?,
        context: LayerContext::from_keyword(fields[3]).ok_or_else(|| bad("context", fields[3]))?,
        polarity: Polarity::from_keyword(fields[4]).ok_or_else(|| bad("polarity", fields[4]))?,
        drl_start: fields[5].to_string(),
        drl_end: fields[6].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Pad;
    use crate::host::Symbol;
    use std::io::Cursor;

    fn host(replies: &str) -> ScriptHost<LineTransport<Cursor<Vec<u8>>, Vec<u8>>> {
        let transport = LineTransport::new(Cursor::new(replies.as_bytes().to_vec()), Vec::new());
        ScriptHost::new(transport, "job1")
    }

    fn sent(host: &ScriptHost<LineTransport<Cursor<Vec<u8>>, Vec<u8>>>) -> String {
        String::from_utf8(host.transport().writer().clone()).unwrap()
    }

    #[test]
    fn test_command_is_prefixed() {
        let mut host = host("0\n\n");
        host.add_pad(Pad::new(0.05, 0.05, Symbol(40.0))).unwrap();
        assert!(sent(&host).starts_with("@%#%@COM add_pad,attributes=no,x=0.05,y=0.05,symbol=r40,"));
    }

    #[test]
    fn test_failed_status_is_an_error() {
        let mut host = host("3\nbad layer\n");
        let err = host.delete_layer("nope").unwrap_err();
        match err {
            HostError::CommandFailed { status, command } => {
                assert_eq!(status, 3);
                assert_eq!(command, "delete_layer,layer=nope");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_step_exists_query() {
        let mut host = host("0\nyes\n");
        assert!(host.step_exists("cpn").unwrap());
        assert_eq!(sent(&host), "@%#%@DO_INFO -t step -e job1/cpn -d EXISTS\n");
    }

    #[test]
    fn test_matrix_rows_query() {
        let mut host = host("0\n3\n1\ttop\tsignal\tboard\tpositive\t\t\n2\tbot\tsignal\tboard\tnegative\t\t\n3\tbd1-2\tdrill\tboard\tpositive\ttop\tbot\n");
        let rows = host.matrix_rows().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].polarity, Polarity::Negative);
        assert_eq!(rows[2].drl_end, "bot");
        assert!(host.copper_layer_names().is_err());
    }

    #[test]
    fn test_limits_parse() {
        let limits = parse_limits("0 0 0.25 0.125").unwrap();
        assert_eq!(limits.xmax, 0.25);
        assert!(parse_limits("0 0 1").is_err());
    }

    #[test]
    fn test_eof_is_io_error() {
        let mut host = host("");
        assert!(matches!(host.step_exists("cpn"), Err(HostError::Io(_))));
    }

    #[test]
    fn test_bad_row_is_protocol_error() {
        assert!(matches!(parse_row("1\ttop\tsignal"), Err(HostError::Protocol(_))));
        assert!(matches!(
            parse_row("1\ttop\tbogus\tboard\tpositive\t\t"),
            Err(HostError::Protocol(_))
        ));
    }
}
