// Copyright 2025 RISC Zero, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Solidity interface of the faucet contract.

use alloy::sol;

sol! {
    #[sol(rpc)]
    #[derive(Debug, PartialEq, Eq)]
    contract IFaucet {
        event Donated(address indexed from, uint256 amount);
        event Claimed(address indexed to, uint256 amount);

        function claimFor(address recipient) external;
        function lastClaim(address account) external view returns (uint256);
        function payoutAmount() external view returns (uint256);
        function minEligibleBalance() external view returns (uint256);
        function cooldown() external view returns (uint256);
    }
}
