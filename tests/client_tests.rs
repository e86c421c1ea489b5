//! Backend adapter behavior against scripted transports.

use std::sync::Mutex;

use ton_wallet::client::transport::{
    AccountStatus, BlockRef, HttpTransport, HttpV4Transport, LiteTransport, RawAccountState,
    RawLiteAccount, RunResult,
};
use ton_wallet::client::{HttpBackend, HttpV4Backend, LiteBackend};
use ton_wallet::tuple::{pack_stack, unpack_stack};
use ton_wallet::{Address, Cell, ContractClient, TupleItem, WalletError};

fn addr(byte: u8) -> Address {
    Address::new(0, [byte; 32])
}

fn block(seqno: u32) -> BlockRef {
    BlockRef {
        seqno,
        root_hash: [0; 32],
        file_hash: [0; 32],
    }
}

struct ScriptedHttp {
    status: AccountStatus,
    balance: u128,
    exit_code: i32,
    stack: Vec<TupleItem>,
}

impl HttpTransport for ScriptedHttp {
    async fn account_state(&self, _address: &Address) -> anyhow::Result<RawAccountState> {
        Ok(RawAccountState {
            status: self.status,
            balance: self.balance,
        })
    }

    async fn run_method(
        &self,
        _address: &Address,
        _method: &str,
        _args: Vec<TupleItem>,
    ) -> anyhow::Result<RunResult> {
        Ok(RunResult {
            exit_code: self.exit_code,
            stack: self.stack.clone(),
        })
    }

    async fn send_message(&self, _boc: &[u8]) -> anyhow::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn http_backend_maps_statuses() {
    let active = HttpBackend::new(ScriptedHttp {
        status: AccountStatus::Active,
        balance: 500,
        exit_code: 0,
        stack: vec![],
    });
    assert!(active.is_deployed(&addr(1)).await.unwrap());
    let state = active.get_state(&addr(1)).await.unwrap();
    assert!(state.deployed && state.active);
    assert_eq!(active.balance(&addr(1)).await.unwrap(), 500);

    let frozen = HttpBackend::new(ScriptedHttp {
        status: AccountStatus::Frozen,
        balance: 0,
        exit_code: 0,
        stack: vec![],
    });
    let state = frozen.get_state(&addr(1)).await.unwrap();
    assert!(state.deployed && !state.active);
    assert!(!frozen.is_deployed(&addr(1)).await.unwrap());

    let uninit = HttpBackend::new(ScriptedHttp {
        status: AccountStatus::Uninitialized,
        balance: 9,
        exit_code: 0,
        stack: vec![],
    });
    let state = uninit.get_state(&addr(1)).await.unwrap();
    assert!(!state.deployed && !state.active);
}

#[tokio::test]
async fn http_backend_surfaces_failed_get_methods() {
    let backend = HttpBackend::new(ScriptedHttp {
        status: AccountStatus::Active,
        balance: 0,
        exit_code: -13,
        stack: vec![],
    });
    let err = backend
        .run_method(&addr(1), "seqno", Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::UnexpectedReply(_)));
}

#[tokio::test]
async fn http_backend_accepts_alternative_success_code() {
    let backend = HttpBackend::new(ScriptedHttp {
        status: AccountStatus::Active,
        balance: 0,
        exit_code: 1,
        stack: vec![TupleItem::Int(42)],
    });
    let mut reader = backend.run_method(&addr(1), "seqno", Vec::new()).await.unwrap();
    assert_eq!(reader.read_int().unwrap(), 42);
}

#[derive(Default)]
struct CountingV4 {
    last_block_calls: Mutex<u32>,
}

impl HttpV4Transport for CountingV4 {
    async fn last_block(&self) -> anyhow::Result<BlockRef> {
        let mut calls = self.last_block_calls.lock().unwrap();
        *calls += 1;
        Ok(block(*calls))
    }

    async fn account_state(
        &self,
        block: &BlockRef,
        _address: &Address,
    ) -> anyhow::Result<RawAccountState> {
        Ok(RawAccountState {
            status: AccountStatus::Active,
            balance: u128::from(block.seqno),
        })
    }

    async fn run_method(
        &self,
        block: &BlockRef,
        _address: &Address,
        _method: &str,
        _args: Vec<TupleItem>,
    ) -> anyhow::Result<RunResult> {
        Ok(RunResult {
            exit_code: 0,
            stack: vec![TupleItem::Int(i128::from(block.seqno))],
        })
    }

    async fn send_message(&self, _boc: &[u8]) -> anyhow::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn v4_backend_fetches_a_fresh_block_per_call() {
    let backend = HttpV4Backend::new(CountingV4::default());

    // the scripted balance echoes the block seqno, so repeated reads must
    // observe advancing blocks rather than a pinned one
    assert_eq!(backend.balance(&addr(1)).await.unwrap(), 1);
    assert_eq!(backend.balance(&addr(1)).await.unwrap(), 2);

    let mut reader = backend.run_method(&addr(1), "seqno", Vec::new()).await.unwrap();
    assert_eq!(reader.read_int().unwrap(), 3);
}

struct ScriptedLite {
    account: Option<RawAccountState>,
    /// Echo the caller's packed stack back when set; otherwise answer with
    /// no result cell at all.
    echo: bool,
}

impl LiteTransport for ScriptedLite {
    async fn masterchain_info(&self) -> anyhow::Result<BlockRef> {
        Ok(block(1))
    }

    async fn account_state(
        &self,
        _block: &BlockRef,
        _address: &Address,
    ) -> anyhow::Result<RawLiteAccount> {
        Ok(RawLiteAccount {
            state: self.account,
        })
    }

    async fn run_method(
        &self,
        _block: &BlockRef,
        _address: &Address,
        _method: &str,
        stack: Cell,
    ) -> anyhow::Result<Option<Cell>> {
        Ok(self.echo.then_some(stack))
    }

    async fn send_message(&self, _boc: &[u8]) -> anyhow::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn lite_backend_treats_missing_account_as_absent() {
    let backend = LiteBackend::new(ScriptedLite {
        account: None,
        echo: false,
    });
    let state = backend.get_state(&addr(1)).await.unwrap();
    assert!(!state.deployed && !state.active);
    assert_eq!(backend.balance(&addr(1)).await.unwrap(), 0);
    assert!(!backend.is_deployed(&addr(1)).await.unwrap());
}

#[tokio::test]
async fn lite_backend_missing_result_is_an_empty_reader() {
    let backend = LiteBackend::new(ScriptedLite {
        account: Some(RawAccountState {
            status: AccountStatus::Active,
            balance: 7,
        }),
        echo: false,
    });
    let reader = backend.run_method(&addr(1), "seqno", Vec::new()).await.unwrap();
    assert!(reader.is_empty());
}

#[tokio::test]
async fn lite_backend_roundtrips_stacks_through_cells() {
    let backend = LiteBackend::new(ScriptedLite {
        account: Some(RawAccountState {
            status: AccountStatus::Active,
            balance: 7,
        }),
        echo: true,
    });
    let args = vec![TupleItem::Int(99), TupleItem::Null];
    let mut reader = backend
        .run_method(&addr(1), "echo", args)
        .await
        .unwrap();
    assert_eq!(reader.pop(), Some(TupleItem::Int(99)));
    assert_eq!(reader.pop(), Some(TupleItem::Null));
    assert_eq!(reader.pop(), None);
}

#[test]
fn pack_and_unpack_agree_on_order() {
    let items = vec![TupleItem::Int(1), TupleItem::Int(2), TupleItem::Int(3)];
    let cell = pack_stack(&items).unwrap();
    assert_eq!(unpack_stack(&cell).unwrap(), items);
}
