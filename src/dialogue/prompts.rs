//! System instructions and opening messages for the seller, buyer and judge.

use super::capability::RoleConfig;
use crate::demographics::Persona;

/// Reply that either side emits to end the conversation.
pub const SENTINEL: &str = "finished";

/// Final prompt sent to the judge after the transcript has been replayed.
pub const BEGIN_EVALUATION_PROMPT: &str = "Begin evaluation.";

const SELLER_INSTRUCTION: &str = "\
You are a salesman selling a product for your client.
You will be talking to a potential customer and will be trying to convince them to buy the product.
You will be given a description of the product and the customer, and you will generate a response to the customer.
You will generate a response that is persuasive and convincing, and that will make the customer want to buy the product.
The conversation is finished once the customer asks to purchase the product or states that they are not interested in the product.
Do not hallucinate or make up information about the product, only use the information that is given to you.
If the buyer says \"finished\", output \"finished\" and do not generate any more responses.";

const BUYER_INSTRUCTION_PREFIX: &str = "\
You are a potential customer where a salesman will try to convince you to buy a product.
This is your persona: ";

const BUYER_INSTRUCTION_SUFFIX: &str = ".
Generate responses as if you are this persona.
Once you clearly state that you want to buy the product, or that you are not interested in the product, the conversation is finished.
When the conversation is finished, output \"finished\" and do not generate any more responses.";

const JUDGE_INSTRUCTION: &str = "\
You are evaluating a sales conversation between a seller and a potential customer.
The conversation so far has been given to you as prior context.
Decide whether the customer accepted or rejected the pitch, and rate the customer's sentiment towards the product.
Respond with a single JSON object and nothing else, in exactly this shape:
{\"decision\": \"accept\" | \"reject\", \"sentiment_analysis\": <integer from 0 to 10>, \"reasoning\": \"<one short paragraph>\"}
0 means extremely negative sentiment and 10 means extremely positive sentiment.";

/// Session configuration for the seller.
pub fn seller_config() -> RoleConfig {
    RoleConfig::new("seller", SELLER_INSTRUCTION)
}

/// Session configuration for a buyer speaking as `persona`.
pub fn buyer_config(persona: &Persona) -> RoleConfig {
    RoleConfig::new(
        "buyer",
        format!(
            "{}{}{}",
            BUYER_INSTRUCTION_PREFIX, persona, BUYER_INSTRUCTION_SUFFIX
        ),
    )
}

/// Session configuration for the judge.
pub fn judge_config() -> RoleConfig {
    RoleConfig::new("judge", JUDGE_INSTRUCTION).with_temperature(0.0)
}

/// First message to the seller: the product text and the full persona.
pub fn opening_message(product_description: &str, persona: &Persona) -> String {
    format!(
        "[INFORMATION]: Product to sell: {}. Customer: {}.",
        product_description.trim(),
        persona
    )
}

/// Whether a reply is the end-of-conversation sentinel.
pub fn is_sentinel(reply: &str) -> bool {
    reply.trim() == SENTINEL
}
