//! Prompt templates for the verdict and reply requests.

use super::ResponseContext;

const SHOULD_RESPOND_CRITERIA: &str = "\
Response options are [RESPOND], [IGNORE] and [STOP].

{agent} should:
- RESPOND when:
* Directly mentioned or asked a question
* Can contribute relevant expertise to the discussion
* Topic aligns with their knowledge and background
* Conversation is active and engaging

- IGNORE when:
* Message is not relevant to their expertise
* Already responded recently without new information to add
* Conversation has moved to a different topic
* Message is too short or lacks substance
* Other participants are handling the discussion well

- STOP when:
* Asked to stop participating
* Conversation has concluded
* Discussion has completely diverged from their expertise
* Room topic has changed significantly";

const SHOULD_RESPOND_TASK: &str = "\
# Task: Choose whether {agent} should respond to the last message.
Consider:
1. Message relevance to {agent}'s expertise
2. Current conversation context
3. Time since last response
4. Value of potential contribution

Answer with exactly one of [RESPOND], [IGNORE] or [STOP].";

const MESSAGE_TASK: &str = "\
# Task: Generate a response in the voice and style of {agent} while:
1. Staying relevant to the room's topic
2. Maintaining conversation context
3. Being helpful but not overly talkative
4. Responding naturally to direct questions or mentions
5. Contributing meaningfully to ongoing discussions

Remember:
- Keep responses concise and focused
- Stay on topic for the current room
- Don't repeat information already shared
- Be natural and conversational

Reply with a JSON object in a ```json fenced block:
{ \"user\": \"{agent}\", \"text\": \"<your message>\", \"action\": \"<optional action>\" }";

fn header(ctx: &ResponseContext<'_>) -> String {
    let mut out = format!("# About {}:\n", ctx.persona.name);
    if !ctx.persona.bio.trim().is_empty() {
        out.push_str(ctx.persona.bio.trim());
        out.push('\n');
    }
    out.push_str(&format!(
        "\nCurrent Room: {}\nRoom Topic: {}\n",
        ctx.room.name_or_id(),
        ctx.room.topic
    ));
    out
}

fn conversation(ctx: &ResponseContext<'_>) -> String {
    format!("Thread Context:\n{}\n", ctx.formatted_thread())
}

/// Prompt asking for a RESPOND / IGNORE / STOP verdict.
pub fn should_respond_prompt(ctx: &ResponseContext<'_>) -> String {
    let agent = &ctx.persona.name;
    [
        header(ctx),
        SHOULD_RESPOND_CRITERIA.replace("{agent}", agent),
        conversation(ctx),
        SHOULD_RESPOND_TASK.replace("{agent}", agent),
    ]
    .join("\n")
}

/// Prompt asking for the reply itself.
pub fn message_prompt(ctx: &ResponseContext<'_>) -> String {
    let agent = &ctx.persona.name;
    [
        header(ctx),
        conversation(ctx),
        MESSAGE_TASK.replace("{agent}", agent),
    ]
    .join("\n")
}
