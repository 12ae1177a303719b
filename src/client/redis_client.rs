//! Blocking client for a live server, built on the `redis` crate.

use std::time::Duration;

use redis::{Cmd, Connection, Pipeline, RedisResult, Value};
use tracing::{debug, info};

use super::{Command, Reply, ScanPage, ScanRequest, StoreClient};
use crate::cancel::CancelToken;
use crate::config::ConnectionConfig;
use crate::error::DoctorError;
use crate::model::SlowLogEntry;
use crate::proto::parse_slowlog;

/// Smallest socket timeout handed to the transport; zero means "block forever".
const MIN_IO_TIMEOUT: Duration = Duration::from_millis(1);

pub struct RedisClient {
    conn: Connection,
    timeout: Duration,
}

impl RedisClient {
    /// Connects, selects the database, authenticates and registers the client name.
    pub fn connect(config: &ConnectionConfig) -> Result<Self, DoctorError> {
        let client = redis::Client::open(config.connection_info())?;
        let mut conn = client.get_connection_with_timeout(config.timeout)?;
        redis::cmd("CLIENT")
            .arg("SETNAME")
            .arg(&config.client_name)
            .query::<()>(&mut conn)?;

        info!("Connected to {} (db {})", config.address(), config.db);
        Ok(Self {
            conn,
            timeout: config.timeout,
        })
    }

    /// Checks `ctx` and caps socket timeouts at whatever is left of its deadline.
    fn arm(&mut self, ctx: &CancelToken) -> Result<(), DoctorError> {
        ctx.check()?;
        let timeout = io_timeout(ctx.remaining(), self.timeout);
        self.conn.set_read_timeout(Some(timeout))?;
        self.conn.set_write_timeout(Some(timeout))?;
        Ok(())
    }

    /// Reports a cancellation or expired deadline in preference to the
    /// socket error it caused.
    fn settle<T>(ctx: &CancelToken, result: RedisResult<T>) -> Result<T, DoctorError> {
        result.map_err(|err| match ctx.check() {
            Err(interrupted) => interrupted,
            Ok(()) => err.into(),
        })
    }
}

impl StoreClient for RedisClient {
    fn scan(&mut self, ctx: &CancelToken, req: &ScanRequest<'_>) -> Result<ScanPage, DoctorError> {
        self.arm(ctx)?;
        let (cursor, keys): (u64, Vec<Vec<u8>>) =
            Self::settle(ctx, scan_command(req).query(&mut self.conn))?;
        debug!("SCAN {} -> {} keys, next cursor {}", req.cursor, keys.len(), cursor);
        Ok(ScanPage { cursor, keys })
    }

    fn pipeline(
        &mut self,
        ctx: &CancelToken,
        commands: &[Command<'_>],
    ) -> Result<Vec<Reply>, DoctorError> {
        if commands.is_empty() {
            return Ok(Vec::new());
        }
        self.arm(ctx)?;
        let values: Vec<Value> =
            Self::settle(ctx, build_pipeline(commands).query(&mut self.conn))?;
        values.into_iter().map(reply_from_value).collect()
    }

    fn slowlog(
        &mut self,
        ctx: &CancelToken,
        count: usize,
    ) -> Result<Vec<SlowLogEntry>, DoctorError> {
        self.arm(ctx)?;
        let reply: Value = Self::settle(
            ctx,
            redis::cmd("SLOWLOG").arg("GET").arg(count).query(&mut self.conn),
        )?;
        Ok(parse_slowlog(&reply)?)
    }
}

/// Socket timeout for one round trip: the configured timeout, cut down to
/// the time left before the deadline, never below [`MIN_IO_TIMEOUT`].
fn io_timeout(remaining: Option<Duration>, timeout: Duration) -> Duration {
    remaining
        .map_or(timeout, |left| left.min(timeout))
        .max(MIN_IO_TIMEOUT)
}

fn scan_command(req: &ScanRequest<'_>) -> Cmd {
    let mut cmd = redis::cmd("SCAN");
    cmd.arg(req.cursor)
        .arg("MATCH")
        .arg(req.pattern)
        .arg("COUNT")
        .arg(req.count);
    if let Some(key_type) = req.key_type {
        cmd.arg("TYPE").arg(key_type.as_str());
    }
    cmd
}

fn build_pipeline(commands: &[Command<'_>]) -> Pipeline {
    let mut pipe = redis::pipe();
    for command in commands {
        let (name, subcommand) = command.words();
        pipe.cmd(name);
        if let Some(sub) = subcommand {
            pipe.arg(sub);
        }
        pipe.arg(command.key());
    }
    pipe
}

fn reply_from_value(value: Value) -> Result<Reply, DoctorError> {
    match value {
        Value::Int(n) => Ok(Reply::Integer(n)),
        Value::SimpleString(s) => Ok(Reply::Status(s)),
        Value::Okay => Ok(Reply::Status("OK".to_string())),
        Value::BulkString(bytes) => Ok(Reply::Status(String::from_utf8_lossy(&bytes).into_owned())),
        Value::VerbatimString { text, .. } => Ok(Reply::Status(text)),
        Value::ServerError(err) => Err(redis::RedisError::from(err).into()),
        other => Err(DoctorError::Protocol(format!(
            "unexpected pipeline reply: {:?}",
            other
        ))),
    }
}
