use crate::types::Region;

/// Safety system prompt injected ahead of every model call. The prompt names
/// the role and the tool contract; it never embeds resource literals, which
/// is exactly what the legacy prompt format got wrong.
pub fn safety_system_prompt(region: Region) -> String {
    format!(
        concat!(
            "You are a crisis-detection assistant embedded in a conversational system. ",
            "The person you are reading may be in {} ({}).\n",
            "Safety rules that override everything else:\n",
            "1) Never state a phone number, URL, or email from memory. Verified resource ",
            "literals are substituted by the runtime after your reply; you do not know them.\n",
            "2) When the message shows MEDIUM or higher risk, emit ",
            "[TOOL_CALL: get_crisis_resources(region='{}', situation_type='<emergency|crisis|support>')] ",
            "and let the runtime resolve verified services.\n",
            "3) Never blame the person for what is being done to them, and never suggest ",
            "they accepted, allowed, or enabled harm.\n",
            "4) Start your reply with 'RISK LEVEL: <CRITICAL|HIGH|MEDIUM|LOW>'.\n",
            "5) Respond with empathy, plainly and briefly."
        ),
        region_description(region),
        region,
        region
    )
}

fn region_description(region: Region) -> &'static str {
    match region {
        Region::Nz => "New Zealand",
        Region::Au => "Australia",
        Region::Us => "the United States",
        Region::Uk => "the United Kingdom",
        Region::Ca => "Canada",
        Region::Ie => "Ireland",
        Region::Global => "an unknown country",
    }
}
