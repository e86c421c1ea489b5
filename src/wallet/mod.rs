//! Wallet orchestration.
//!
//! A [`Wallet`] owns a mnemonic, a backend connection, and a registry of
//! jetton assets. It starts dormant: construction never touches the network
//! or derives keys, `init` does both exactly once. Transfers are built,
//! signed, submitted, and confirmed by watching the contract's sequence
//! number advance.

pub mod assets;
pub mod contract;

pub use assets::{AssetEntry, AssetRegistry, JettonConfig, NATIVE_ASSET};
pub use contract::WalletContract;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use crate::address::Address;
use crate::cell::{Cell, CellBuilder};
use crate::client::{ContractClient, ContractState};
use crate::config::WalletConfig;
use crate::crypto::{keypair_from_mnemonic, KeyPair};
use crate::error::{Result, WalletError};
use crate::message::{
    jetton_transfer_body, ExternalMessage, TransferMessage, SEND_MODE_PAY_GAS_SEPARATELY,
};
use crate::tuple::TupleItem;
use crate::units::{from_base_units, to_base_units, NATIVE_DECIMALS};

struct WalletInner {
    keys: KeyPair,
    contract: WalletContract,
    /// On-chain state snapshot, taken at init and refreshed after submits.
    contract_state: ContractState,
    assets: AssetRegistry,
}

/// A mnemonic-backed wallet bound to one backend connection.
pub struct Wallet<C> {
    client: Arc<C>,
    name: String,
    mnemonic: SecretString,
    wallet_code: Cell,
    config: WalletConfig,
    inner: Option<WalletInner>,
}

impl<C: ContractClient> Wallet<C> {
    /// Construct a dormant wallet. No keys are derived and no network
    /// traffic happens until [`Wallet::init`].
    pub fn new(
        client: Arc<C>,
        name: impl Into<String>,
        mnemonic: SecretString,
        wallet_code: Cell,
        config: WalletConfig,
    ) -> Self {
        Wallet {
            client,
            name: name.into(),
            mnemonic,
            wallet_code,
            config,
            inner: None,
        }
    }

    /// Derive keys and the contract address, then snapshot on-chain state.
    pub async fn init(&mut self) -> Result<()> {
        if self.inner.is_some() {
            return Err(WalletError::AlreadyInitialized);
        }
        let keys = keypair_from_mnemonic(self.mnemonic.expose_secret())?;
        let contract = WalletContract::derive(
            keys.public_key(),
            self.config.wallet_id,
            self.config.workchain,
            self.wallet_code.clone(),
        )?;
        let contract_state = self.client.get_state(contract.address()).await?;
        info!(
            wallet = %self.name,
            address = %contract.address(),
            deployed = contract_state.deployed,
            "wallet initialized"
        );
        self.inner = Some(WalletInner {
            keys,
            contract,
            contract_state,
            assets: AssetRegistry::new(),
        });
        Ok(())
    }

    fn inner(&self) -> Result<&WalletInner> {
        self.inner.as_ref().ok_or(WalletError::Uninitialized)
    }

    fn inner_mut(&mut self) -> Result<&mut WalletInner> {
        self.inner.as_mut().ok_or(WalletError::Uninitialized)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mnemonic(&self) -> &SecretString {
        &self.mnemonic
    }

    /// Address of the wallet contract.
    pub fn ton_address(&self) -> Result<&Address> {
        Ok(self.inner()?.contract.address())
    }

    /// Resolved sub-account address of a registered jetton.
    pub fn jetton_address(&self, asset: &str) -> Result<&Address> {
        Ok(&self.inner()?.assets.get(asset)?.wallet)
    }

    /// Current sequence number. Zero for a contract that is not deployed
    /// yet or answers with an empty stack.
    pub async fn seqno(&self) -> Result<u32> {
        let inner = self.inner()?;
        let address = inner.contract.address();
        if !self.client.is_deployed(address).await? {
            return Ok(0);
        }
        let mut reader = self.client.run_method(address, "seqno", Vec::new()).await?;
        if reader.is_empty() {
            return Ok(0);
        }
        let seqno = reader.read_uint()?;
        u32::try_from(seqno)
            .map_err(|_| WalletError::UnexpectedReply(format!("seqno {seqno} out of range")))
    }

    /// Native balance in base units. An undeployed contract reads as zero
    /// from the snapshot, without a network call.
    pub async fn ton_balance(&self) -> Result<u128> {
        let inner = self.inner()?;
        if !inner.contract_state.deployed {
            return Ok(0);
        }
        self.client.balance(inner.contract.address()).await
    }

    /// Jetton balance in base units. A sub-account that was not deployed at
    /// registration holds nothing, so no query is made.
    pub async fn jetton_balance(&self, asset: &str) -> Result<u128> {
        let entry = self.inner()?.assets.get(asset)?.clone();
        if !entry.state.deployed {
            return Ok(0);
        }
        let mut reader = self
            .client
            .run_method(&entry.wallet, "get_wallet_data", Vec::new())
            .await?;
        if reader.is_empty() {
            return Ok(0);
        }
        reader.read_uint()
    }

    /// Balance of one asset as a decimal string.
    pub async fn get_balance(&self, asset: &str) -> Result<String> {
        if asset == NATIVE_ASSET {
            return Ok(from_base_units(self.ton_balance().await?, NATIVE_DECIMALS));
        }
        let decimals = self.inner()?.assets.get(asset)?.decimals;
        Ok(from_base_units(self.jetton_balance(asset).await?, decimals))
    }

    /// Native and all registered jetton balances, as decimal strings.
    pub async fn get_all_balances(&self) -> Result<BTreeMap<String, String>> {
        let mut balances = BTreeMap::new();
        balances.insert(
            NATIVE_ASSET.to_string(),
            self.get_balance(NATIVE_ASSET).await?,
        );
        let names: Vec<String> = self
            .inner()?
            .assets
            .names()
            .into_iter()
            .map(str::to_string)
            .collect();
        for name in names {
            let balance = self.get_balance(&name).await?;
            balances.insert(name, balance);
        }
        Ok(balances)
    }

    /// Register a jetton: resolve this wallet's sub-account address via the
    /// master contract and cache it together with its current state.
    /// Re-registering a name replaces the previous entry.
    pub async fn add_jetton(&mut self, jetton: JettonConfig) -> Result<()> {
        let own_address = *self.inner()?.contract.address();
        let owner_slice = CellBuilder::new()
            .store_address(Some(&own_address))?
            .build();
        let mut reader = self
            .client
            .run_method(
                &jetton.master_address,
                "get_wallet_address",
                vec![TupleItem::Slice(owner_slice)],
            )
            .await?;
        if reader.is_empty() {
            return Err(WalletError::UnexpectedReply(format!(
                "jetton master {} returned no wallet address",
                jetton.master_address
            )));
        }
        let wallet_address = reader.read_address()?;
        let state = self.client.get_state(&wallet_address).await?;
        debug!(
            wallet = %self.name,
            asset = %jetton.name,
            sub_account = %wallet_address,
            deployed = state.deployed,
            "jetton registered"
        );

        let replaced = self.inner_mut()?.assets.insert(
            jetton.name.clone(),
            AssetEntry {
                master: jetton.master_address,
                wallet: wallet_address,
                decimals: jetton.decimals,
                state,
            },
        );
        if replaced {
            warn!(wallet = %self.name, asset = %jetton.name, "jetton re-registered, replacing previous entry");
        }
        Ok(())
    }

    fn to_units(&self, asset: &str, amount: &str) -> Result<u128> {
        let decimals = if asset == NATIVE_ASSET {
            NATIVE_DECIMALS
        } else {
            self.inner()?.assets.get(asset)?.decimals
        };
        to_base_units(amount, decimals)
    }

    /// Build an unsigned transfer message for `amount` base units.
    ///
    /// Native transfers go straight to the destination, non-bounceable so
    /// funds stick even on an undeployed recipient. Jetton transfers go to
    /// this wallet's own sub-account, bounceable, carrying the configured
    /// attach fee.
    pub fn create_transfer_message_raw(
        &self,
        asset: &str,
        to: &Address,
        amount: u128,
    ) -> Result<TransferMessage> {
        if asset == NATIVE_ASSET {
            return Ok(TransferMessage::new(*to, amount, false));
        }
        let entry = self.inner()?.assets.get(asset)?;
        let body = jetton_transfer_body(to, amount, self.config.forward_amount)?;
        Ok(TransferMessage::new(entry.wallet, self.config.attach_fee, true).with_body(body))
    }

    /// Like [`Wallet::create_transfer_message_raw`], with a decimal amount.
    pub fn create_transfer_message(
        &self,
        asset: &str,
        to: &Address,
        amount: &str,
    ) -> Result<TransferMessage> {
        let units = self.to_units(asset, amount)?;
        self.create_transfer_message_raw(asset, to, units)
    }

    /// Transfer `amount` base units and wait for confirmation. Returns the
    /// body hash as a tracking id, or `None` for a zero amount, which is a
    /// no-op that never touches the registry or the network.
    pub async fn transfer_raw(
        &mut self,
        asset: &str,
        to: &Address,
        amount: u128,
    ) -> Result<Option<[u8; 32]>> {
        if amount == 0 {
            debug!(wallet = %self.name, asset, "zero-amount transfer skipped");
            return Ok(None);
        }
        let message = self.create_transfer_message_raw(asset, to, amount)?;
        let hash = message.body_hash();
        info!(
            wallet = %self.name,
            asset,
            to = %to,
            amount,
            hash = %hex::encode(hash),
            "submitting transfer"
        );
        self.submit(vec![message]).await?;
        Ok(Some(hash))
    }

    /// Like [`Wallet::transfer_raw`], with a decimal amount.
    pub async fn transfer(
        &mut self,
        asset: &str,
        to: &Address,
        amount: &str,
    ) -> Result<Option<[u8; 32]>> {
        let units = self.to_units(asset, amount)?;
        self.transfer_raw(asset, to, units).await
    }

    /// Submit prebuilt messages as one signed order and wait for it.
    pub async fn send(&mut self, messages: Vec<TransferMessage>) -> Result<()> {
        self.submit(messages).await
    }

    /// Deploy the wallet contract: a self-addressed transfer carries the
    /// state-init, then we wait until the contract turns active.
    pub async fn deploy_contract(&mut self) -> Result<()> {
        let inner = self.inner()?;
        if inner.contract_state.deployed {
            return Ok(());
        }
        info!(wallet = %self.name, "deploying wallet contract");
        let own = *inner.contract.address();
        let message = TransferMessage::new(own, self.config.attach_fee, false);
        self.submit(vec![message]).await?;
        self.wait_deploy().await
    }

    async fn submit(&mut self, messages: Vec<TransferMessage>) -> Result<()> {
        let seqno = self.seqno().await?;
        let valid_until = Utc::now().timestamp() + self.config.message_ttl;

        let inner = self.inner()?;
        let body = inner.contract.signed_transfer_body(
            &inner.keys,
            seqno,
            valid_until as u32,
            SEND_MODE_PAY_GAS_SEPARATELY,
            &messages,
        )?;
        let init = if inner.contract_state.deployed {
            None
        } else {
            Some(inner.contract.state_init().clone())
        };
        let external = ExternalMessage {
            dest: *inner.contract.address(),
            init,
            body,
        };
        let cell = external.to_cell()?;

        self.client.send_message(&cell).await?;
        self.wait_seqno(seqno).await?;

        // the first confirmed order also deploys the contract
        if !self.inner()?.contract_state.deployed {
            let address = *self.inner()?.contract.address();
            let state = self.client.get_state(&address).await?;
            self.inner_mut()?.contract_state = state;
        }
        Ok(())
    }

    /// Wait until the contract's seqno moves past `prev`, returning the
    /// changed value.
    async fn wait_seqno(&self, prev: u32) -> Result<u32> {
        let attempts = self.config.max_poll_attempts;
        for _ in 0..attempts {
            tokio::time::sleep(self.config.poll_interval).await;
            let current = self.seqno().await?;
            if current > prev {
                return Ok(current);
            }
        }
        Err(WalletError::ConfirmationTimeout { attempts })
    }

    /// Wait until the contract is active on-chain.
    async fn wait_deploy(&mut self) -> Result<()> {
        let attempts = self.config.max_poll_attempts;
        let address = *self.inner()?.contract.address();
        for _ in 0..attempts {
            let state = self.client.get_state(&address).await?;
            if state.active {
                self.inner_mut()?.contract_state = state;
                info!(wallet = %self.name, "wallet contract deployed");
                return Ok(());
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
        Err(WalletError::ConfirmationTimeout { attempts })
    }
}
