use std::time::Duration;

use r2d2::PooledConnection;
use redis::{Client, Script, Value};

use super::index::{IndexSet, ScanPage};
use super::{OrderStore, StoreError, StoreResult, TxOp, TxOutcome};
use crate::db::RedisPool;

/// Checks every guard, then applies every op. Runs atomically on the server.
///
/// KEYS[1] is the index set and KEYS[i + 1] the key of op `i`. ARGV holds an
/// (opcode, value) pair per op. Returns 0 on commit, otherwise the 1-based
/// position of the first op whose guard failed.
const TRANSACTION_SCRIPT: &str = r#"
local index = KEYS[1]
local n = #KEYS - 1
for i = 1, n do
  local op = ARGV[2 * i - 1]
  if op == 'set_nx' or op == 'set_xx' or op == 'del' then
    local exists = redis.call('EXISTS', KEYS[i + 1]) == 1
    if (op == 'set_nx' and exists) or (op ~= 'set_nx' and not exists) then
      return i
    end
  end
end
for i = 1, n do
  local op = ARGV[2 * i - 1]
  local key = KEYS[i + 1]
  if op == 'set_nx' or op == 'set_xx' then
    redis.call('SET', key, ARGV[2 * i])
  elseif op == 'del' then
    redis.call('DEL', key)
  elseif op == 'sadd' then
    redis.call('SADD', index, key)
  elseif op == 'srem' then
    redis.call('SREM', index, key)
  end
end
return 0
"#;

/// Opcode and value passed to [`TRANSACTION_SCRIPT`] for one op.
fn encode_op(op: &TxOp) -> (&'static str, &str) {
    match op {
        TxOp::SetIfAbsent { value, .. } => ("set_nx", value),
        TxOp::SetIfPresent { value, .. } => ("set_xx", value),
        TxOp::DeleteExisting { .. } => ("del", ""),
        TxOp::IndexAdd { .. } => ("sadd", ""),
        TxOp::IndexRemove { .. } => ("srem", ""),
    }
}

/// [`OrderStore`] backed by Redis strings and a Redis set.
///
/// Each call checks a connection out of the r2d2 pool and arms its socket
/// read/write timeouts, so a stalled server fails the call with
/// [`StoreError::Timeout`] instead of pinning a worker thread.
pub struct RedisStore {
    pool: RedisPool,
    index: IndexSet,
    command_timeout: Duration,
    transaction_script: Script,
}

impl RedisStore {
    pub fn new(pool: RedisPool, index: IndexSet, command_timeout: Duration) -> Self {
        Self {
            pool,
            index,
            command_timeout,
            transaction_script: Script::new(TRANSACTION_SCRIPT),
        }
    }

    fn conn(&self) -> StoreResult<PooledConnection<Client>> {
        let conn = self.pool.get()?;
        conn.set_read_timeout(Some(self.command_timeout))?;
        conn.set_write_timeout(Some(self.command_timeout))?;
        Ok(conn)
    }
}

impl OrderStore for RedisStore {
    fn get_string(&self, key: &str) -> StoreResult<String> {
        let mut conn = self.conn()?;
        let value: Option<String> = redis::cmd("GET").arg(key).query(&mut *conn)?;
        value.ok_or_else(|| StoreError::not_found(key))
    }

    fn set_if_absent(&self, key: &str, value: &str) -> StoreResult<bool> {
        let mut conn = self.conn()?;
        let reply: Value = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .query(&mut *conn)?;
        Ok(reply != Value::Nil)
    }

    fn set_if_present(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let reply: Value = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("XX")
            .query(&mut *conn)?;
        if reply == Value::Nil {
            return Err(StoreError::not_found(key));
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.conn()?;
        let removed: u64 = redis::cmd("DEL").arg(key).query(&mut *conn)?;
        Ok(removed > 0)
    }

    fn multi_get(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn()?;
        Ok(redis::cmd("MGET").arg(keys).query(&mut *conn)?)
    }

    fn index(&self) -> &IndexSet {
        &self.index
    }

    fn index_add(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.conn()?;
        redis::cmd("SADD")
            .arg(self.index.name())
            .arg(key)
            .query::<()>(&mut *conn)?;
        Ok(())
    }

    fn index_remove(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.conn()?;
        redis::cmd("SREM")
            .arg(self.index.name())
            .arg(key)
            .query::<()>(&mut *conn)?;
        Ok(())
    }

    fn index_scan(&self, cursor: u64, pattern: &str, count: u64) -> StoreResult<ScanPage> {
        let mut conn = self.conn()?;
        let (cursor, keys): (u64, Vec<String>) = redis::cmd("SSCAN")
            .arg(self.index.name())
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count.max(1))
            .query(&mut *conn)?;
        Ok(ScanPage { keys, cursor })
    }

    fn execute(&self, ops: Vec<TxOp>) -> StoreResult<TxOutcome> {
        let mut conn = self.conn()?;
        let mut invocation = self.transaction_script.prepare_invoke();
        invocation.key(self.index.name());
        for op in &ops {
            let (opcode, value) = encode_op(op);
            invocation.key(op.key()).arg(opcode).arg(value);
        }

        let failed: i64 = invocation.invoke(&mut *conn)?;
        match usize::try_from(failed) {
            Ok(0) => Ok(TxOutcome::Committed),
            Ok(position) if position <= ops.len() => Ok(TxOutcome::Rejected { op: position - 1 }),
            _ => Err(StoreError::UnexpectedReply(format!(
                "transaction script returned {failed} for {} ops",
                ops.len()
            ))),
        }
    }

    fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let reply: String = redis::cmd("PING").query(&mut *conn)?;
        if reply != "PONG" {
            return Err(StoreError::UnexpectedReply(reply));
        }
        Ok(())
    }
}
